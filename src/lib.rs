pub mod app;
pub mod badge;
pub mod client;
pub mod clock;
pub mod config;
pub mod correlator;
pub mod counter;
pub mod detector;
pub mod dom;
pub mod errors;
pub mod handlers;
pub mod indicator;
pub mod models;
pub mod notify;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use counter::CounterService;
pub use state::AppState;
