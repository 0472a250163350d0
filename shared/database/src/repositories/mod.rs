//! Repository module for database CRUD operations
//!
//! Postgres implementations of the store traits.

pub mod alert;
pub mod department;
pub mod document;
pub mod product;

pub use alert::AlertRepository;
pub use department::DepartmentRepository;
pub use document::DocumentRepository;
pub use product::ProductRepository;
