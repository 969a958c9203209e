mod error;
mod id;
mod run;
mod run_status;
mod step;

pub use error::*;
pub use id::*;
pub use run::*;
pub use run_status::*;
pub use step::*;
