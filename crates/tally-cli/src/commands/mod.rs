pub mod dispatch;
pub mod emit;
pub mod prune;
pub mod recover;
pub mod work;
