use futures::{
    channel::oneshot,
    executor::LocalPool,
    task::{LocalSpawnExt, SpawnError},
};
use optimistic::{reduce, Optimistic};

#[derive(Clone, Debug, PartialEq)]
struct Post {
    likes: u32,
    liked: bool,
}

enum Click {
    Like,
    Unlike,
}

fn apply_click(post: &Post, click: &Click) -> Post {
    match click {
        Click::Like => Post {
            likes: post.likes + 1,
            liked: true,
        },
        Click::Unlike => Post {
            likes: post.likes.saturating_sub(1),
            liked: false,
        },
    }
}

type Reply = oneshot::Sender<Result<Post, String>>;

fn click(pool: &LocalPool, post: &Optimistic<Post>, action: Click) -> Result<Reply, SpawnError> {
    let (reply, response) = oneshot::channel();
    let post = post.clone();
    pool.spawner().spawn_local(async move {
        let result = post
            .run(reduce(action, apply_click), async move {
                response.await.unwrap_or_else(|_| Err("canceled".to_string()))
            })
            .await;
        if let Err(e) = result {
            println!("  ! {e}");
        }
    })?;
    Ok(reply)
}

fn main() -> Result<(), SpawnError> {
    let mut pool = LocalPool::new();
    let post = Optimistic::new(Post {
        likes: 5,
        liked: false,
    });
    let _s = post.subscribe({
        let post = post.clone();
        move |n| println!("  {n}: {:?}", post.view())
    });

    println!("like, server accepts");
    let reply = click(&pool, &post, Click::Like)?;
    pool.run_until_stalled();
    let _ = reply.send(Ok(Post {
        likes: 6,
        liked: true,
    }));
    pool.run_until_stalled();

    println!("unlike, server fails");
    let reply = click(&pool, &post, Click::Unlike)?;
    pool.run_until_stalled();
    let _ = reply.send(Err("503 Service Unavailable".to_string()));
    pool.run_until_stalled();

    println!("unlike then like, answered in reverse order");
    let unlike = click(&pool, &post, Click::Unlike)?;
    let like = click(&pool, &post, Click::Like)?;
    pool.run_until_stalled();
    let _ = like.send(Ok(Post {
        likes: 6,
        liked: true,
    }));
    pool.run_until_stalled();
    let _ = unlike.send(Ok(Post {
        likes: 6,
        liked: true,
    }));
    pool.run_until_stalled();

    println!("final: {:?}", post.snapshot());
    Ok(())
}
