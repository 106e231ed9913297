pub mod card;
pub mod item;
pub mod tree;
