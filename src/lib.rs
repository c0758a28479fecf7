pub mod api;
pub mod dispatch;
pub mod import;
pub mod jobs;
pub mod logging;
pub mod store;

pub mod util {
    pub mod env;
}
