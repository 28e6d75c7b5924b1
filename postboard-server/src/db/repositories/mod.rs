mod author_repository;
mod post_repository;
mod tag_repository;

pub use author_repository::{AuthorRepository, NewAuthor};
pub use post_repository::{NewPost, PostRepository};
pub use tag_repository::TagRepository;
