//! 规则描述关键词表
//!
//! 分类、操作符推断和特殊短语都由关键词表驱动，表本身可从 JSON 反序列化，
//! 新增语言或同义词无需改代码。匹配时忽略大小写和空白；
//! 含 `...` 的短语表示各片段按顺序出现（如 `在...之间`）。

use serde::{Deserialize, Serialize};

/// 去除空白并转为小写，作为关键词匹配的输入
pub fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// 单个短语是否出现在已 compact 的文本中
fn phrase_matches(phrase: &str, compact_text: &str) -> bool {
    let phrase = compact(phrase);
    if phrase.is_empty() {
        return false;
    }

    let mut rest = compact_text;
    for fragment in phrase.split("...").filter(|f| !f.is_empty()) {
        match rest.find(fragment) {
            Some(pos) => rest = &rest[pos + fragment.len()..],
            None => return false,
        }
    }
    true
}

/// 任一短语出现在已 compact 的文本中
pub fn contains_any(phrases: &[String], compact_text: &str) -> bool {
    phrases.iter().any(|p| phrase_matches(p, compact_text))
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// 中英文关键词表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSet {
    pub length_girth: Vec<String>,
    pub girth: Vec<String>,
    pub length: Vec<String>,
    pub second_longest: Vec<String>,
    pub weight: Vec<String>,
    pub residential: Vec<String>,
    pub non_residential: Vec<String>,
    pub remote: Vec<String>,
    pub extended_remote: Vec<String>,
    pub unauthorized: Vec<String>,
    pub greater: Vec<String>,
    pub less: Vec<String>,
    pub between: Vec<String>,
    pub home_delivery: Vec<String>,
    pub signature: Vec<String>,
    pub address_correction: Vec<String>,
    pub size: Vec<String>,
    pub volumetric: Vec<String>,
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self {
            length_girth: list(&[
                "length+girth",
                "length plus girth",
                "长+周长",
                "长度+周长",
                "长+围长",
                "长度+围长",
                "长度加周长",
                "长加周长",
            ]),
            girth: list(&["girth", "周长", "围长"]),
            length: list(&["longest side", "length", "最长边", "长度", "单边"]),
            second_longest: list(&["second longest", "第二长边", "次长边"]),
            weight: list(&["weight", "lbs", "lb", "pound", "kg", "重量", "磅", "公斤"]),
            residential: list(&["residential", "住宅"]),
            non_residential: list(&[
                "非住宅",
                "商业",
                "commercial",
                "non-residential",
                "non residential",
            ]),
            remote: list(&["remote", "偏远"]),
            extended_remote: list(&["extended", "极偏远"]),
            unauthorized: list(&["不可发包裹", "unauthorized"]),
            greater: list(&[">", "大于", "greater", "more", "over", "超过"]),
            less: list(&["<", "小于", "less", "under", "below", "低于"]),
            between: list(&["between", "介于", "在...之间"]),
            home_delivery: list(&["fedex home delivery"]),
            signature: list(&["signature", "签名"]),
            address_correction: list(&["address correction", "修改地址"]),
            size: list(&["dimension", "size", "尺寸", "边长"]),
            volumetric: list(&["volumetric", "体积重", "材积"]),
        }
    }
}

impl KeywordSet {
    /// 从 JSON 加载，缺失的分组使用内置关键词
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact() {
        assert_eq!(compact("Length + Girth > 165"), "length+girth>165");
        assert_eq!(compact("重量 大于 100 磅"), "重量大于100磅");
    }

    #[test]
    fn test_phrase_matching_ignores_case_and_spaces() {
        let phrases = list(&["longest side"]);
        assert!(contains_any(&phrases, &compact("LONGEST  SIDE over 108")));
        assert!(!contains_any(&phrases, &compact("longest edge")));
    }

    #[test]
    fn test_ordered_fragments() {
        let phrases = list(&["在...之间"]);
        assert!(contains_any(&phrases, &compact("重量在100到200磅之间")));
        assert!(!contains_any(&phrases, &compact("之间在100")));
    }

    #[test]
    fn test_empty_phrase_never_matches() {
        assert!(!contains_any(&list(&["", "   "]), "anything"));
    }

    #[test]
    fn test_partial_json_keeps_builtin_groups() {
        let keywords = KeywordSet::from_json(r#"{"remote": ["remote", "entlegen"]}"#).unwrap();
        assert!(contains_any(&keywords.remote, &compact("Entlegen")));
        assert_eq!(keywords.weight, KeywordSet::default().weight);
    }
}
