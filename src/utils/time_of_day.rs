// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 调度时刻的解析与格式化
//!
//! 操作员只输入到分钟，但与后端交互时始终使用秒级精度 `HH:MM:SS`。

use chrono::{NaiveTime, ParseError};

const WIRE_FORMAT: &str = "%H:%M:%S";
const DISPLAY_FORMAT: &str = "%H:%M";

/// 解析 `H:MM`、`HH:MM` 或 `HH:MM:SS` 格式的时刻
pub fn parse(input: &str) -> Result<NaiveTime, ParseError> {
    let trimmed = input.trim();
    NaiveTime::parse_from_str(trimmed, WIRE_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, DISPLAY_FORMAT))
}

/// 格式化为传输格式 `HH:MM:SS`
pub fn to_wire(time: &NaiveTime) -> String {
    time.format(WIRE_FORMAT).to_string()
}

/// 格式化为显示格式 `HH:MM`，秒被截断
pub fn to_display(time: &NaiveTime) -> String {
    time.format(DISPLAY_FORMAT).to_string()
}

/// `NaiveTime` 的 serde 适配器，序列化为 `HH:MM:SS`
pub mod wire {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::to_wire(time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw).map_err(de::Error::custom)
    }

    /// 可选字段版本，用于部分更新请求
    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|raw| super::super::parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
#[path = "time_of_day_test.rs"]
mod tests;
