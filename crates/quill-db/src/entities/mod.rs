//! Database entities

pub mod author;
pub mod category;
pub mod comment;
pub mod post;
pub mod post_category;
pub mod post_tag;
pub mod tag;

pub use author::Entity as Author;
pub use category::Entity as Category;
pub use comment::Entity as Comment;
pub use post::Entity as Post;
pub use post_category::Entity as PostCategory;
pub use post_tag::Entity as PostTag;
pub use tag::Entity as Tag;

pub mod prelude {
    pub use super::author::Entity as Author;
    pub use super::category::Entity as Category;
    pub use super::comment::Entity as Comment;
    pub use super::post::Entity as Post;
    pub use super::post_category::Entity as PostCategory;
    pub use super::post_tag::Entity as PostTag;
    pub use super::tag::Entity as Tag;
}
