//! 探测器注册表与排序引擎.
//!
//! 注册表保存一组只读的探测器描述, 每次识别调用:
//! 1. 按扫描顺序 (优先级降序, 同级内扩展名命中者优先, 其余按注册顺序) 依次运行探测器
//! 2. 丢弃置信度为 NONE 的建议
//! 3. 按置信度降序, 优先级降序, 扫描位置升序, 提交顺序升序稳定排序
//!
//! 调用之间不保留任何状态, 注册表可在线程间共享.

use std::cmp::Reverse;
use std::path::Path;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use tao_core::{TaoError, TaoResult};

use crate::caps::FormatDescriptor;
use crate::probability::Probability;
use crate::probe::Probe;
use crate::rank::Rank;
use crate::source::{ByteSource, CachedSource, FileSource};
use crate::window::{DEFAULT_MAX_PEEK, TypeFind};

/// 识别配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeFindConfig {
    /// 单次读取上限 (字节)
    pub max_peek_size: usize,
    /// 同一优先级内, 扩展名命中的探测器是否先运行
    pub prefer_extension_hints: bool,
}

impl Default for TypeFindConfig {
    fn default() -> Self {
        Self {
            max_peek_size: DEFAULT_MAX_PEEK,
            prefer_extension_hints: true,
        }
    }
}

/// 探测器描述
#[derive(Debug, Clone)]
pub struct ProbeDescriptor {
    name: String,
    rank: Rank,
    probe: Probe,
    extensions: Vec<String>,
    caps: FormatDescriptor,
}

impl ProbeDescriptor {
    /// 探测器名称 (注册表内唯一)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 优先级
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// 扩展名提示
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// 探测器
    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    /// 声明的格式描述
    pub fn caps(&self) -> &FormatDescriptor {
        &self.caps
    }

    /// 扩展名是否命中
    fn matches_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// 排序后的识别结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedSuggestion {
    /// 建议的格式
    pub caps: FormatDescriptor,
    /// 置信度
    pub probability: Probability,
    /// 给出建议的探测器的优先级
    pub rank: Rank,
    /// 给出建议的探测器名称
    pub probe: String,
}

/// 排序用的候选项
struct Candidate {
    suggestion: RankedSuggestion,
    /// 探测器在本次扫描中的位置
    position: usize,
    /// 本次调用内的提交序号
    emission: usize,
}

/// 探测器注册表
pub struct TypeFindRegistry {
    probes: Vec<ProbeDescriptor>,
    config: TypeFindConfig,
}

impl TypeFindRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::with_config(TypeFindConfig::default())
    }

    /// 以指定配置创建空注册表
    pub fn with_config(config: TypeFindConfig) -> Self {
        Self {
            probes: Vec::new(),
            config,
        }
    }

    /// 当前配置
    pub fn config(&self) -> &TypeFindConfig {
        &self.config
    }

    /// 注册一个探测器
    ///
    /// 名称在注册表内必须唯一, 重复注册返回 [`TaoError::InvalidArgument`].
    pub fn register(
        &mut self,
        name: impl Into<String>,
        rank: Rank,
        probe: Probe,
        extensions: &[&str],
        caps: FormatDescriptor,
    ) -> TaoResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(TaoError::InvalidArgument("探测器名称不能为空".into()));
        }
        if self.probes.iter().any(|p| p.name == name) {
            return Err(TaoError::InvalidArgument(format!(
                "探测器 {} 已注册",
                name
            )));
        }
        trace!("注册探测器: {} ({})", name, rank);
        self.probes.push(ProbeDescriptor {
            name,
            rank,
            probe,
            extensions: extensions.iter().map(|e| (*e).to_string()).collect(),
            caps,
        });
        Ok(())
    }

    /// 已注册的探测器数量
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// 是否没有任何探测器
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// 按注册顺序遍历探测器描述
    pub fn descriptors(&self) -> impl Iterator<Item = &ProbeDescriptor> {
        self.probes.iter()
    }

    /// 按名称查找探测器描述
    pub fn descriptor(&self, name: &str) -> Option<&ProbeDescriptor> {
        self.probes.iter().find(|p| p.name == name)
    }

    /// 计算扫描顺序
    pub fn scan_order(&self, filename: Option<&str>) -> Vec<&ProbeDescriptor> {
        let ext = filename
            .filter(|_| self.config.prefer_extension_hints)
            .and_then(|name| Path::new(name).extension())
            .and_then(|e| e.to_str());
        let mut order: Vec<(usize, &ProbeDescriptor)> = self.probes.iter().enumerate().collect();
        order.sort_by_key(|(seq, p)| {
            let hinted = ext.is_some_and(|e| p.matches_extension(e));
            (Reverse(p.rank), !hinted, *seq)
        });
        order.into_iter().map(|(_, p)| p).collect()
    }

    /// 运行探测器并排序
    ///
    /// `stop_at_maximum` 为真时, 一旦出现 MAXIMUM 建议就不再运行后续探测器:
    /// 后续探测器优先级不会更高, 扫描位置更靠后, 不可能胜出.
    fn run(
        &self,
        source: &mut dyn ByteSource,
        filename: Option<&str>,
        stop_at_maximum: bool,
    ) -> Vec<RankedSuggestion> {
        let mut cached = CachedSource::new(source);
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut emission = 0usize;

        for (position, desc) in self.scan_order(filename).into_iter().enumerate() {
            let mut tf = TypeFind::with_max_peek(&mut cached, self.config.max_peek_size);
            desc.probe.run(&mut tf, &desc.caps);
            let mut reached_maximum = false;
            for s in tf.into_suggestions() {
                if s.probability.is_none() {
                    continue;
                }
                trace!("{}: {} (置信度 {})", desc.name, s.caps, s.probability);
                reached_maximum |= s.probability == Probability::MAXIMUM;
                candidates.push(Candidate {
                    suggestion: RankedSuggestion {
                        caps: s.caps,
                        probability: s.probability,
                        rank: desc.rank,
                        probe: desc.name.clone(),
                    },
                    position,
                    emission,
                });
                emission += 1;
            }
            if stop_at_maximum && reached_maximum {
                trace!("{} 给出最高置信度, 停止扫描", desc.name);
                break;
            }
        }

        let (hits, misses) = cached.stats();
        trace!("读取缓存: 命中 {}, 未命中 {}", hits, misses);

        candidates.sort_by_key(|c| {
            (
                Reverse(c.suggestion.probability),
                Reverse(c.suggestion.rank),
                c.position,
                c.emission,
            )
        });
        candidates.into_iter().map(|c| c.suggestion).collect()
    }

    /// 识别流格式, 返回最佳格式描述
    pub fn identify(
        &self,
        source: &mut dyn ByteSource,
        filename: Option<&str>,
    ) -> Option<FormatDescriptor> {
        self.identify_best(source, filename).map(|s| s.caps)
    }

    /// 识别流格式, 返回最佳结果及其置信度与来源
    pub fn identify_best(
        &self,
        source: &mut dyn ByteSource,
        filename: Option<&str>,
    ) -> Option<RankedSuggestion> {
        let best = self.run(source, filename, true).into_iter().next();
        match &best {
            Some(b) => debug!(
                "识别结果: {} (置信度 {}, 探测器 {})",
                b.caps, b.probability, b.probe
            ),
            None => debug!("无法识别流格式"),
        }
        best
    }

    /// 运行全部探测器, 返回排序后的所有建议
    pub fn identify_all(
        &self,
        source: &mut dyn ByteSource,
        filename: Option<&str>,
    ) -> Vec<RankedSuggestion> {
        self.run(source, filename, false)
    }

    /// 识别文件格式, 文件名作为扩展名提示
    pub fn identify_file(&self, path: impl AsRef<Path>) -> TaoResult<Option<FormatDescriptor>> {
        let path = path.as_ref();
        let mut source = FileSource::open(path)?;
        let filename = path.file_name().and_then(|n| n.to_str());
        Ok(self.identify(&mut source, filename))
    }
}

impl Default for TypeFindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{BytePattern, PatternProbe, PatternRule};
    use crate::source::MemorySource;

    static ABCD_MAX: &[PatternRule] = &[PatternRule {
        patterns: &[BytePattern::new(0, b"ABCD")],
        probability: Probability::MAXIMUM,
    }];

    static AB_LIKELY: &[PatternRule] = &[PatternRule {
        patterns: &[BytePattern::new(0, b"AB")],
        probability: Probability::LIKELY,
    }];

    fn pattern(rules: &'static [PatternRule]) -> Probe {
        Probe::Pattern(PatternProbe { rules })
    }

    fn never(_tf: &mut TypeFind<'_>) {}

    fn zero(tf: &mut TypeFind<'_>) {
        tf.suggest(Probability::NONE, FormatDescriptor::new("x/zero"));
    }

    fn two_likely(tf: &mut TypeFind<'_>) {
        tf.suggest(Probability::LIKELY, FormatDescriptor::new("x/first"));
        tf.suggest(Probability::LIKELY, FormatDescriptor::new("x/second"));
    }

    fn sample_registry() -> TypeFindRegistry {
        let mut reg = TypeFindRegistry::new();
        reg.register(
            "x/ab",
            Rank::SECONDARY,
            pattern(AB_LIKELY),
            &["ab"],
            FormatDescriptor::new("x/ab"),
        )
        .unwrap();
        reg.register(
            "x/abcd",
            Rank::PRIMARY,
            pattern(ABCD_MAX),
            &["abcd"],
            FormatDescriptor::new("x/abcd"),
        )
        .unwrap();
        reg.register(
            "x/never",
            Rank::PRIMARY,
            Probe::Algorithmic(never),
            &[],
            FormatDescriptor::new("x/never"),
        )
        .unwrap();
        reg.register(
            "x/zero",
            Rank::MARGINAL,
            Probe::Algorithmic(zero),
            &[],
            FormatDescriptor::new("x/zero"),
        )
        .unwrap();
        reg
    }

    #[test]
    fn test_重复名称被拒绝() {
        let mut reg = sample_registry();
        let err = reg
            .register(
                "x/ab",
                Rank::PRIMARY,
                Probe::Algorithmic(never),
                &[],
                FormatDescriptor::new("x/ab"),
            )
            .unwrap_err();
        assert!(matches!(err, TaoError::InvalidArgument(_)));
        assert_eq!(reg.len(), 4);
    }

    #[test]
    fn test_最佳结果与完整列表() {
        let reg = sample_registry();
        let mut src = MemorySource::new(b"ABCDEFGH".to_vec());
        let best = reg.identify_best(&mut src, None).unwrap();
        assert_eq!(best.caps.name(), "x/abcd");
        assert_eq!(best.probability, Probability::MAXIMUM);
        assert_eq!(best.rank, Rank::PRIMARY);

        let all = reg.identify_all(&mut src, None);
        let names: Vec<_> = all.iter().map(|s| s.caps.name()).collect();
        // NONE 建议被丢弃
        assert_eq!(names, vec!["x/abcd", "x/ab"]);
    }

    #[test]
    fn test_无法识别() {
        let reg = sample_registry();
        let mut src = MemorySource::new(b"zzzz".to_vec());
        assert!(reg.identify(&mut src, None).is_none());
        assert!(reg.identify_all(&mut src, None).is_empty());

        let mut empty = MemorySource::new(Vec::new());
        assert!(reg.identify(&mut empty, None).is_none());
    }

    #[test]
    fn test_扫描顺序() {
        let mut reg = sample_registry();
        reg.register(
            "x/hinted",
            Rank::PRIMARY,
            Probe::Algorithmic(never),
            &["hint"],
            FormatDescriptor::new("x/hinted"),
        )
        .unwrap();

        let names = |f: Option<&str>| -> Vec<String> {
            reg.scan_order(f).iter().map(|p| p.name().to_string()).collect()
        };
        assert_eq!(
            names(None),
            vec!["x/abcd", "x/never", "x/hinted", "x/ab", "x/zero"]
        );
        // 同级内扩展名命中者优先, 不跨越优先级
        assert_eq!(
            names(Some("clip.HINT")),
            vec!["x/hinted", "x/abcd", "x/never", "x/ab", "x/zero"]
        );
        assert_eq!(
            names(Some("clip.ab")),
            vec!["x/abcd", "x/never", "x/hinted", "x/ab", "x/zero"]
        );
    }

    #[test]
    fn test_关闭扩展名提示() {
        let mut reg = TypeFindRegistry::with_config(TypeFindConfig {
            prefer_extension_hints: false,
            ..TypeFindConfig::default()
        });
        reg.register(
            "a",
            Rank::PRIMARY,
            Probe::Algorithmic(never),
            &[],
            FormatDescriptor::new("a"),
        )
        .unwrap();
        reg.register(
            "b",
            Rank::PRIMARY,
            Probe::Algorithmic(never),
            &["b"],
            FormatDescriptor::new("b"),
        )
        .unwrap();
        let order: Vec<_> = reg.scan_order(Some("x.b")).iter().map(|p| p.name()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_同一探测器的多条建议按提交顺序() {
        let mut reg = TypeFindRegistry::new();
        reg.register(
            "x/two",
            Rank::PRIMARY,
            Probe::Algorithmic(two_likely),
            &[],
            FormatDescriptor::new("x/two"),
        )
        .unwrap();
        let mut src = MemorySource::new(vec![0u8; 4]);
        let all = reg.identify_all(&mut src, None);
        assert_eq!(all[0].caps.name(), "x/first");
        assert_eq!(all[1].caps.name(), "x/second");
        assert_eq!(all[0].probe, "x/two");
    }

    #[test]
    fn test_排序与注册顺序无关() {
        let mut forward = TypeFindRegistry::new();
        let mut backward = TypeFindRegistry::new();
        let entries: [(&str, Rank, &'static [PatternRule]); 2] = [
            ("x/ab", Rank::PRIMARY, AB_LIKELY),
            ("x/abcd", Rank::SECONDARY, ABCD_MAX),
        ];
        for (name, rank, rules) in entries {
            forward
                .register(name, rank, pattern(rules), &[], FormatDescriptor::new(name))
                .unwrap();
        }
        for (name, rank, rules) in entries.iter().rev() {
            backward
                .register(*name, *rank, pattern(rules), &[], FormatDescriptor::new(*name))
                .unwrap();
        }
        let mut src = MemorySource::new(b"ABCD".to_vec());
        let a = forward.identify_all(&mut src, None);
        let b = backward.identify_all(&mut src, None);
        assert_eq!(a, b);
        // 置信度优先于优先级
        assert_eq!(a[0].caps.name(), "x/abcd");
    }

    #[test]
    fn test_配置反序列化() {
        let config: TypeFindConfig = serde_json::from_str(r#"{"max_peek_size": 4096}"#).unwrap();
        assert_eq!(config.max_peek_size, 4096);
        assert!(config.prefer_extension_hints);
    }

    #[test]
    fn test_识别文件() {
        let reg = sample_registry();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.ab");
        std::fs::write(&path, b"ABxx").unwrap();
        let caps = reg.identify_file(&path).unwrap().unwrap();
        assert_eq!(caps.name(), "x/ab");

        assert!(reg.identify_file(dir.path().join("missing.bin")).is_err());
    }

    #[test]
    fn test_注册表可跨线程共享() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypeFindRegistry>();
    }
}
