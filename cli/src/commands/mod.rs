mod blame;
mod dump;
mod helpers;
mod series;
mod summary;

pub(crate) use blame::cmd_blame;
pub(crate) use dump::cmd_dump;
pub(crate) use series::cmd_time_series;
pub(crate) use summary::{cmd_summary, cmd_today};
