#![forbid(unsafe_code)]

pub mod access;
pub mod admin;
pub mod app_services;
pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod error;
pub mod feedback;
pub mod live_view;
pub mod permission;
pub mod profile;
pub mod progress;

pub use itetude_core::Clock;

pub use access::{AdminGate, is_admin};
pub use admin::{AdminStats, AdminStatsFeed};
pub use app_services::AppServices;
pub use auth::{AuthProvider, SessionAuth};
pub use catalog::{CatalogService, CertificationListing, PathPage};
pub use dashboard::{DashboardFeed, DashboardInputs, DashboardView};
pub use error::{
    AccessError, AppServicesError, CatalogServiceError, FeedbackServiceError, ProfileServiceError,
};
pub use feedback::FeedbackService;
pub use live_view::{LiveCollection, LiveDocument};
pub use permission::{Operation, PermissionErrorEmitter, PermissionErrorEvent};
pub use profile::{AccountInfo, ProfileService};
pub use progress::ProgressTracker;
