pub mod api;
pub mod forms;
pub mod models;
pub mod money;
pub mod pagination;

pub use money::{Cents, MoneyError};
pub use pagination::{Page, PageWindow, POSTS_PER_PAGE};
