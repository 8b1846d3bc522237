pub mod frame;
pub mod municipality;
pub mod observation;
pub mod period;
pub mod series;
