use std::fmt::Display;

use assert_call::call;

/// Records `drop {label}` when dropped.
pub struct DropProbe(String);

pub fn drop_probe(label: impl Display) -> DropProbe {
    DropProbe(label.to_string())
}

impl Drop for DropProbe {
    fn drop(&mut self) {
        call!("drop {}", self.0);
    }
}
