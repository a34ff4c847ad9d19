//! 格式描述.
//!
//! 探测结果由 MIME 风格的格式名加上探测过程中发现的参数组成,
//! 例如 `audio/mpeg, mpegversion=1, layer=3`.

use std::fmt;

use serde::Serialize;
use serde::ser::{SerializeMap, SerializeStruct, Serializer};

/// 格式参数值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// 整数
    Int(i64),
    /// 布尔
    Bool(bool),
    /// 字符串
    Str(String),
}

impl ParamValue {
    /// 以整数读取
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// 以布尔读取
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// 以字符串读取
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Str(v) => write!(f, "\"{}\"", v),
        }
    }
}

/// 格式描述
///
/// 参数保留插入顺序用于显示; 相等比较只看格式名与参数集合, 与顺序无关.
#[derive(Debug, Clone)]
pub struct FormatDescriptor {
    /// 格式名 (MIME 风格)
    name: String,
    /// 参数列表, 键唯一
    params: Vec<(String, ParamValue)>,
}

impl FormatDescriptor {
    /// 创建不带参数的描述
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// 追加整数参数 (键已存在时覆盖其值)
    pub fn with_int(mut self, key: &str, value: i64) -> Self {
        self.set_param(key, ParamValue::Int(value));
        self
    }

    /// 追加布尔参数
    pub fn with_bool(mut self, key: &str, value: bool) -> Self {
        self.set_param(key, ParamValue::Bool(value));
        self
    }

    /// 追加字符串参数
    pub fn with_str(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_param(key, ParamValue::Str(value.into()));
        self
    }

    /// 设置参数 (键已存在时覆盖其值)
    pub fn set_param(&mut self, key: &str, value: ParamValue) {
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.params.push((key.to_string(), value)),
        }
    }

    /// 格式名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 查询参数
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// 查询整数参数
    pub fn int_param(&self, key: &str) -> Option<i64> {
        self.param(key).and_then(ParamValue::as_int)
    }

    /// 按插入顺序遍历参数
    pub fn params(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl PartialEq for FormatDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .all(|(k, v)| other.param(k).is_some_and(|ov| ov == v))
    }
}

impl Eq for FormatDescriptor {}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (k, v) in &self.params {
            write!(f, ", {}={}", k, v)?;
        }
        Ok(())
    }
}

/// 按插入顺序输出参数的映射视图
struct ParamsMap<'a>(&'a [(String, ParamValue)]);

impl Serialize for ParamsMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Serialize for FormatDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("FormatDescriptor", 2)?;
        st.serialize_field("name", &self.name)?;
        st.serialize_field("params", &ParamsMap(&self.params))?;
        st.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_参数顺序无关的相等() {
        let a = FormatDescriptor::new("audio/mpeg")
            .with_int("mpegversion", 1)
            .with_int("layer", 3);
        let b = FormatDescriptor::new("audio/mpeg")
            .with_int("layer", 3)
            .with_int("mpegversion", 1);
        assert_eq!(a, b);

        let c = b.clone().with_int("layer", 2);
        assert_ne!(a, c);
        assert_ne!(a, FormatDescriptor::new("audio/mpeg"));
        assert_ne!(FormatDescriptor::new("audio/mpeg"), a);
    }

    #[test]
    fn test_显示与查询() {
        let caps = FormatDescriptor::new("video/mpeg")
            .with_bool("systemstream", true)
            .with_int("mpegversion", 1);
        assert_eq!(
            caps.to_string(),
            "video/mpeg, systemstream=true, mpegversion=1"
        );
        assert_eq!(caps.int_param("mpegversion"), Some(1));
        assert_eq!(caps.param("systemstream").and_then(ParamValue::as_bool), Some(true));
        assert!(caps.param("layer").is_none());

        let tiff = FormatDescriptor::new("image/tiff").with_str("endianness", "LE");
        assert_eq!(tiff.to_string(), "image/tiff, endianness=\"LE\"");
    }

    #[test]
    fn test_序列化保持插入顺序() {
        let caps = FormatDescriptor::new("audio/mpeg")
            .with_int("mpegversion", 1)
            .with_int("layer", 3);
        let keys: Vec<_> = caps.params().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["mpegversion", "layer"]);
        let json = serde_json::to_string(&caps).unwrap();
        assert_eq!(
            json,
            r#"{"name":"audio/mpeg","params":{"mpegversion":1,"layer":3}}"#
        );
    }
}
