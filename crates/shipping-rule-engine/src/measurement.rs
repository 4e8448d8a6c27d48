//! 包裹计量数据
//!
//! `ShipmentData` 是上游传入的原始记录，字段可能缺失或类型错误；
//! `Measurement` 是提取后的强类型记录；`NormalizedMeasurement` 是统一到 LB/IN 后的记录。

use crate::error::{Result, RuleError};
use crate::units::{DimensionUnit, UnitDefaults, WeightUnit};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// 原始包裹数据
#[derive(Debug, Clone, Default)]
pub struct ShipmentData {
    data: Value,
}

impl ShipmentData {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// 从 JSON 对象创建
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let data: Value = serde_json::from_str(json)?;
        Ok(Self { data })
    }

    /// 获取字段值，依次尝试 snake_case 和 camelCase 名称；null 视为缺失
    pub fn get_field(&self, names: &[&str]) -> Option<&Value> {
        let map = self.data.as_object()?;
        names
            .iter()
            .filter_map(|name| map.get(*name))
            .find(|v| !v.is_null())
    }

    /// 获取底层数据
    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// 强类型计量记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub weight: Decimal,
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub weight_unit: WeightUnit,
    pub dimension_unit: DimensionUnit,
    #[serde(default)]
    pub is_residential: bool,
    #[serde(default)]
    pub remote_level: u32,
    #[serde(default)]
    pub calculation_date: Option<NaiveDate>,
    #[serde(default)]
    pub product_id: Option<String>,
}

impl Measurement {
    /// 以 LB / IN 为单位创建
    pub fn new(weight: Decimal, length: Decimal, width: Decimal, height: Decimal) -> Self {
        Self {
            weight,
            length,
            width,
            height,
            weight_unit: WeightUnit::Lb,
            dimension_unit: DimensionUnit::In,
            is_residential: false,
            remote_level: 0,
            calculation_date: None,
            product_id: None,
        }
    }

    pub fn with_units(mut self, weight_unit: WeightUnit, dimension_unit: DimensionUnit) -> Self {
        self.weight_unit = weight_unit;
        self.dimension_unit = dimension_unit;
        self
    }

    pub fn with_residential(mut self, is_residential: bool) -> Self {
        self.is_residential = is_residential;
        self
    }

    pub fn with_remote_level(mut self, remote_level: u32) -> Self {
        self.remote_level = remote_level;
        self
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    /// 从原始记录提取，缺失的单位使用默认值
    pub fn from_shipment(data: &ShipmentData, defaults: &UnitDefaults) -> Result<Self> {
        let weight_unit = match data.get_field(&["weight_unit", "weightUnit"]) {
            Some(v) => string_field("weight_unit", v)?.parse()?,
            None => defaults.weight_unit,
        };
        let dimension_unit = match data.get_field(&["dimension_unit", "dimensionUnit"]) {
            Some(v) => string_field("dimension_unit", v)?.parse()?,
            None => defaults.dimension_unit,
        };

        Ok(Self {
            weight: required_decimal(data, "weight", &["weight"])?,
            length: required_decimal(data, "length", &["length"])?,
            width: required_decimal(data, "width", &["width"])?,
            height: required_decimal(data, "height", &["height"])?,
            weight_unit,
            dimension_unit,
            is_residential: data
                .get_field(&["is_residential", "isResidential"])
                .map(|v| bool_field("is_residential", v))
                .transpose()?
                .unwrap_or(false),
            remote_level: data
                .get_field(&["remote_level", "remoteLevel"])
                .map(|v| level_field("remote_level", v))
                .transpose()?
                .unwrap_or(0),
            calculation_date: data
                .get_field(&["calculation_date", "calculationDate"])
                .map(date_field)
                .transpose()?,
            product_id: data
                .get_field(&["product_id", "productId"])
                .and_then(|v| match v {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty()),
        })
    }
}

/// 统一到 LB / IN 并向上取整后的计量记录
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMeasurement {
    pub weight: Decimal,
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub is_residential: bool,
    pub remote_level: u32,
    pub calculation_date: Option<NaiveDate>,
    pub product_id: Option<String>,
}

/// 派生尺寸：周长 = 2 × (宽 + 高)，总长度 = 长 + 周长
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMeasurement {
    pub girth: Decimal,
    pub total_length: Decimal,
}

impl DerivedMeasurement {
    pub fn compute(data: &NormalizedMeasurement) -> Result<Self> {
        let overflow = || RuleError::ArithmeticOverflow("length + girth".to_string());

        let girth = data
            .width
            .checked_add(data.height)
            .and_then(|sum| sum.checked_mul(Decimal::from(2)))
            .ok_or_else(overflow)?;
        let total_length = data.length.checked_add(girth).ok_or_else(overflow)?;

        Ok(Self {
            girth,
            total_length,
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(field: &str, expected: &str, value: &Value) -> RuleError {
    RuleError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
        actual: match value {
            Value::String(s) => format!("string '{}'", s),
            other => type_name(other).to_string(),
        },
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn required_decimal(data: &ShipmentData, field: &str, names: &[&str]) -> Result<Decimal> {
    let value = data
        .get_field(names)
        .ok_or_else(|| RuleError::FieldNotFound(field.to_string()))?;

    let parsed = match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    };

    parsed.ok_or_else(|| mismatch(field, "number", value))
}

fn string_field<'a>(field: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| mismatch(field, "string", value))
}

fn bool_field(field: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_u64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_u64() == Some(1) => Ok(true),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            _ => Err(mismatch(field, "boolean", value)),
        },
        _ => Err(mismatch(field, "boolean", value)),
    }
}

fn level_field(field: &str, value: &Value) -> Result<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    parsed
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| mismatch(field, "non-negative integer", value))
}

fn date_field(value: &Value) -> Result<NaiveDate> {
    let s = value
        .as_str()
        .ok_or_else(|| mismatch("calculation_date", "date string", value))?;

    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| RuleError::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_extract_full_record() {
        let data = ShipmentData::new(json!({
            "weight": 70,
            "length": "10.5",
            "width": 10,
            "height": 10,
            "weight_unit": "kg",
            "dimensionUnit": "CM",
            "isResidential": true,
            "remote_level": 2,
            "calculation_date": "2024-03-01",
            "product_id": "SKU-1"
        }));

        let m = Measurement::from_shipment(&data, &UnitDefaults::default()).unwrap();

        assert_eq!(m.weight, dec("70"));
        assert_eq!(m.length, dec("10.5"));
        assert_eq!(m.weight_unit, WeightUnit::Kg);
        assert_eq!(m.dimension_unit, DimensionUnit::Cm);
        assert!(m.is_residential);
        assert_eq!(m.remote_level, 2);
        assert_eq!(m.calculation_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(m.product_id.as_deref(), Some("SKU-1"));
    }

    #[test]
    fn test_missing_units_use_defaults() {
        let data = ShipmentData::new(json!({
            "weight": 1, "length": 1, "width": 1, "height": 1
        }));
        let defaults = UnitDefaults {
            weight_unit: WeightUnit::Oz,
            dimension_unit: DimensionUnit::Cm,
        };

        let m = Measurement::from_shipment(&data, &defaults).unwrap();

        assert_eq!(m.weight_unit, WeightUnit::Oz);
        assert_eq!(m.dimension_unit, DimensionUnit::Cm);
        assert!(!m.is_residential);
        assert_eq!(m.remote_level, 0);
        assert!(m.product_id.is_none());
    }

    #[test]
    fn test_non_numeric_weight_rejected() {
        let data = ShipmentData::new(json!({
            "weight": "abc", "length": 1, "width": 1, "height": 1
        }));

        let err = Measurement::from_shipment(&data, &UnitDefaults::default()).unwrap_err();
        assert!(matches!(err, RuleError::TypeMismatch { ref field, .. } if field == "weight"));
    }

    #[test]
    fn test_missing_dimension_rejected() {
        let data = ShipmentData::new(json!({ "weight": 1, "length": 1, "width": 1 }));

        let err = Measurement::from_shipment(&data, &UnitDefaults::default()).unwrap_err();
        assert!(matches!(err, RuleError::FieldNotFound(ref f) if f == "height"));
    }

    #[test]
    fn test_invalid_unit_and_date_rejected() {
        let defaults = UnitDefaults::default();

        let data = ShipmentData::new(json!({
            "weight": 1, "length": 1, "width": 1, "height": 1, "weight_unit": "stone"
        }));
        assert!(matches!(
            Measurement::from_shipment(&data, &defaults),
            Err(RuleError::InvalidUnit(_))
        ));

        let data = ShipmentData::new(json!({
            "weight": 1, "length": 1, "width": 1, "height": 1, "calculation_date": "yesterday"
        }));
        assert!(matches!(
            Measurement::from_shipment(&data, &defaults),
            Err(RuleError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_negative_remote_level_rejected() {
        let data = ShipmentData::new(json!({
            "weight": 1, "length": 1, "width": 1, "height": 1, "remote_level": -1
        }));
        assert!(Measurement::from_shipment(&data, &UnitDefaults::default()).is_err());
    }

    #[test]
    fn test_derived_measurement() {
        let data = NormalizedMeasurement {
            weight: dec("10"),
            length: dec("50"),
            width: dec("20"),
            height: dec("20"),
            is_residential: false,
            remote_level: 0,
            calculation_date: None,
            product_id: None,
        };

        let derived = DerivedMeasurement::compute(&data).unwrap();
        assert_eq!(derived.girth, dec("80"));
        assert_eq!(derived.total_length, dec("130"));
    }

    #[test]
    fn test_derived_measurement_overflow() {
        let data = NormalizedMeasurement {
            weight: Decimal::ZERO,
            length: Decimal::MAX,
            width: Decimal::MAX,
            height: Decimal::ONE,
            is_residential: false,
            remote_level: 0,
            calculation_date: None,
            product_id: None,
        };

        assert!(matches!(
            DerivedMeasurement::compute(&data),
            Err(RuleError::ArithmeticOverflow(_))
        ));
    }
}
