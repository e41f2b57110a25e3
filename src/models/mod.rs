pub mod daily;
pub mod heat_load;
pub mod hourly;

pub use daily::{DailyRegionLoad, DailyStationTemperature, HeatwaveEvent, HeatwaveFlag};
pub use heat_load::{DayType, HeatLoadDaily, HeatLoadDailyBuilder};
pub use hourly::{HourlyLoadReading, HourlyTemperatureReading, RawTemperatureSample};
