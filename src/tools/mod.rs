pub mod element;
pub mod navigation;
