// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::folder::{DomainError, Folder, ScheduleType};
use crate::utils::time_of_day;
use chrono::NaiveTime;

/// 以周日为0的星期名称
const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// 星期索引（0=周日）对应的英文名称
pub fn weekday_name(day: u8) -> Option<&'static str> {
    WEEKDAYS.get(usize::from(day)).copied()
}

/// 将调度描述转换为可读的重复周期文本
///
/// # 参数
///
/// * `schedule_type` - 调度类型
/// * `time` - 调度时刻，显示时截断到分钟
/// * `day` - 星期几（0=周日），仅每周调度使用
///
/// # 返回值
///
/// * `Ok(String)` - 例如 `every day at 02:00`
/// * `Err(DomainError)` - 每周调度缺少或给出了非法的星期几
pub fn format_schedule(
    schedule_type: ScheduleType,
    time: &NaiveTime,
    day: Option<u8>,
) -> Result<String, DomainError> {
    let time = time_of_day::to_display(time);
    match schedule_type {
        ScheduleType::Daily => Ok(format!("every day at {}", time)),
        ScheduleType::Weekly => {
            let day = day.ok_or(DomainError::MissingScheduleDay)?;
            let weekday = weekday_name(day).ok_or(DomainError::InvalidScheduleDay(day))?;
            Ok(format!("every {} at {}", weekday, time))
        }
        ScheduleType::Monthly => Ok(format!("on day 1 of every month at {}", time)),
    }
}

/// 格式化文件夹的调度
pub fn describe(folder: &Folder) -> Result<String, DomainError> {
    format_schedule(folder.schedule_type, &folder.schedule_time, folder.schedule_day)
}

#[cfg(test)]
#[path = "recurrence_test.rs"]
mod tests;
