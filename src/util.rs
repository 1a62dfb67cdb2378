pub(crate) mod retry;
pub mod text;
