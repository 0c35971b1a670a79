//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! `&mut PgConnection` as the first argument, so the same call works on a
//! pooled connection or inside an open transaction.

pub mod bug_repo;
pub mod build_repo;
pub mod comment_repo;
pub mod cve_repo;
pub mod package_repo;
pub mod release_repo;
pub mod update_repo;

pub use bug_repo::BugRepo;
pub use build_repo::BuildRepo;
pub use comment_repo::CommentRepo;
pub use cve_repo::CveRepo;
pub use package_repo::PackageRepo;
pub use release_repo::ReleaseRepo;
pub use update_repo::UpdateRepo;
