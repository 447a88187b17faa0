pub mod pagination;
pub mod username_index;
