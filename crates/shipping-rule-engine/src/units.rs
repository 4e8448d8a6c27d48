//! 计量单位换算
//!
//! 重量统一换算为磅（LB），尺寸统一换算为英寸（IN），换算后向上取整。
//! 承运商按整单位计费，向上取整是计费规则而不是精度处理。

use crate::error::{Result, RuleError};
use crate::measurement::{Measurement, NormalizedMeasurement};
use freight_shared::config::UnitsConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 1 公斤 = 2.20462 磅
pub fn lb_per_kg() -> Decimal {
    Decimal::new(220462, 5)
}

/// 1 磅 = 16 盎司
pub fn oz_per_lb() -> Decimal {
    Decimal::from(16)
}

/// 1 英寸 = 2.54 厘米
pub fn cm_per_in() -> Decimal {
    Decimal::new(254, 2)
}

/// 重量单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeightUnit {
    Lb,
    Kg,
    Oz,
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lb => "LB",
            Self::Kg => "KG",
            Self::Oz => "OZ",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for WeightUnit {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "LB" | "LBS" | "POUND" | "POUNDS" | "磅" => Ok(Self::Lb),
            "KG" | "KGS" | "KILOGRAM" | "KILOGRAMS" | "公斤" | "千克" => Ok(Self::Kg),
            "OZ" | "OUNCE" | "OUNCES" | "盎司" => Ok(Self::Oz),
            other => Err(RuleError::InvalidUnit(other.to_string())),
        }
    }
}

/// 尺寸单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DimensionUnit {
    In,
    Cm,
}

impl fmt::Display for DimensionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => write!(f, "IN"),
            Self::Cm => write!(f, "CM"),
        }
    }
}

impl FromStr for DimensionUnit {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "IN" | "INCH" | "INCHES" | "英寸" => Ok(Self::In),
            "CM" | "CENTIMETER" | "CENTIMETERS" | "厘米" => Ok(Self::Cm),
            other => Err(RuleError::InvalidUnit(other.to_string())),
        }
    }
}

/// 记录未携带单位时使用的默认单位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitDefaults {
    pub weight_unit: WeightUnit,
    pub dimension_unit: DimensionUnit,
}

impl Default for UnitDefaults {
    fn default() -> Self {
        Self {
            weight_unit: WeightUnit::Lb,
            dimension_unit: DimensionUnit::In,
        }
    }
}

impl UnitDefaults {
    pub fn from_config(config: &UnitsConfig) -> Result<Self> {
        Ok(Self {
            weight_unit: config.default_weight_unit.parse()?,
            dimension_unit: config.default_dimension_unit.parse()?,
        })
    }
}

/// 单位换算器（纯函数，不输出日志）
pub struct UnitConverter;

impl UnitConverter {
    /// 重量换算为磅并向上取整
    pub fn normalize_weight(weight: Decimal, unit: WeightUnit) -> Decimal {
        match unit {
            WeightUnit::Kg => weight.saturating_mul(lb_per_kg()).ceil(),
            WeightUnit::Oz => (weight / oz_per_lb()).ceil(),
            WeightUnit::Lb => weight.ceil(),
        }
    }

    /// 单个尺寸换算为英寸并向上取整
    pub fn normalize_dimension(value: Decimal, unit: DimensionUnit) -> Decimal {
        match unit {
            DimensionUnit::Cm => (value / cm_per_in()).ceil(),
            DimensionUnit::In => value.ceil(),
        }
    }

    /// 换算整条计量记录，长宽高各自独立取整
    pub fn normalize(measurement: &Measurement) -> NormalizedMeasurement {
        let unit = measurement.dimension_unit;

        NormalizedMeasurement {
            weight: Self::normalize_weight(measurement.weight, measurement.weight_unit),
            length: Self::normalize_dimension(measurement.length, unit),
            width: Self::normalize_dimension(measurement.width, unit),
            height: Self::normalize_dimension(measurement.height, unit),
            is_residential: measurement.is_residential,
            remote_level: measurement.remote_level,
            calculation_date: measurement.calculation_date,
            product_id: measurement.product_id.clone(),
        }
    }
}
