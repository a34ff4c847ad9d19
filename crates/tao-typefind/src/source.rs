//! 字节数据源.
//!
//! 探测引擎只需要两种能力: 按偏移随机读取一段字节, 以及 (可能未知的) 总长度.
//! 本模块定义 [`ByteSource`] trait 与几种常用实现:
//! - [`MemorySource`]: 内存缓冲区, 可模拟长度未知或单次读取上限的宿主
//! - [`FileSource`]: 本地文件
//! - `HttpSource`: HTTP 流式下载 (需要 `http` feature)
//! - [`CachedSource`]: 单次探测调用内的读取缓存

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use bytes::Bytes;
use log::{debug, trace};
use tao_core::TaoResult;

/// 可随机读取的字节数据源
pub trait ByteSource: Send {
    /// 从 `offset` 处读取至多 `len` 字节
    ///
    /// 返回的数据只在到达流末尾时短于 `len`.
    /// 偏移越界, 读取失败或超出宿主允许的单次读取量时返回 `None`.
    fn peek(&mut self, offset: u64, len: usize) -> Option<Bytes>;

    /// 数据源总长度, 未知时返回 `None`
    fn size(&self) -> Option<u64>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn peek(&mut self, offset: u64, len: usize) -> Option<Bytes> {
        (**self).peek(offset, len)
    }

    fn size(&self) -> Option<u64> {
        (**self).size()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn peek(&mut self, offset: u64, len: usize) -> Option<Bytes> {
        (**self).peek(offset, len)
    }

    fn size(&self) -> Option<u64> {
        (**self).size()
    }
}

// ========================
// 内存数据源
// ========================

/// 内存缓冲区数据源
///
/// 用于测试和内存中处理.
#[derive(Debug, Clone)]
pub struct MemorySource {
    /// 数据缓冲区
    data: Bytes,
    /// 单次读取上限, 超过时读取失败
    peek_limit: Option<usize>,
    /// 是否对外隐藏长度
    hide_size: bool,
}

impl MemorySource {
    /// 从已有数据创建
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            peek_limit: None,
            hide_size: false,
        }
    }

    /// 限制单次读取的最大字节数
    pub fn with_peek_limit(mut self, limit: usize) -> Self {
        self.peek_limit = Some(limit);
        self
    }

    /// 对外隐藏长度, 模拟长度未知的流
    pub fn without_size(mut self) -> Self {
        self.hide_size = true;
        self
    }
}

impl ByteSource for MemorySource {
    fn peek(&mut self, offset: u64, len: usize) -> Option<Bytes> {
        if self.peek_limit.is_some_and(|limit| len > limit) {
            return None;
        }
        let start = usize::try_from(offset).ok()?;
        if start > self.data.len() {
            return None;
        }
        let end = start.saturating_add(len).min(self.data.len());
        Some(self.data.slice(start..end))
    }

    fn size(&self) -> Option<u64> {
        if self.hide_size {
            None
        } else {
            Some(self.data.len() as u64)
        }
    }
}

// ========================
// 文件数据源
// ========================

/// 本地文件数据源
pub struct FileSource {
    file: File,
    size: Option<u64>,
}

impl FileSource {
    /// 打开本地文件
    pub fn open(path: impl AsRef<Path>) -> TaoResult<Self> {
        let file = File::open(path.as_ref())?;
        let size = file.metadata().ok().map(|m| m.len());
        Ok(Self { file, size })
    }

    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

impl ByteSource for FileSource {
    fn peek(&mut self, offset: u64, len: usize) -> Option<Bytes> {
        if self.size.is_some_and(|size| offset > size) {
            return None;
        }
        match self.read_at(offset, len) {
            Ok(buf) if buf.is_empty() && len > 0 => None,
            Ok(buf) => Some(Bytes::from(buf)),
            Err(e) => {
                debug!("文件读取失败: offset={}, len={}, {}", offset, len, e);
                None
            }
        }
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}

// ========================
// 读取缓存
// ========================

/// 缓存条目
struct CacheEntry {
    offset: u64,
    data: Bytes,
    /// 数据短于请求长度, 说明已到达流末尾
    at_eof: bool,
}

impl CacheEntry {
    fn lookup(&self, offset: u64, len: usize) -> Option<Bytes> {
        let end = self.offset + self.data.len() as u64;
        if offset < self.offset || offset > end {
            return None;
        }
        let want_end = offset.saturating_add(len as u64);
        if want_end > end && !self.at_eof {
            return None;
        }
        let start = (offset - self.offset) as usize;
        let stop = (want_end.min(end) - self.offset) as usize;
        Some(self.data.slice(start..stop))
    }
}

/// 单次探测调用内的读取缓存
///
/// 多个探测器常常重复读取流开头的同一段数据, 缓存命中时不再访问底层数据源.
/// 缓存总量受 `budget` 限制, 超出时淘汰最早的条目.
pub struct CachedSource<'a> {
    inner: &'a mut dyn ByteSource,
    entries: Vec<CacheEntry>,
    used: usize,
    budget: usize,
    hits: u64,
    misses: u64,
}

impl<'a> CachedSource<'a> {
    /// 默认缓存上限 (4 MB)
    pub const DEFAULT_BUDGET: usize = 4 * 1024 * 1024;
    /// 最多保留的条目数
    pub const MAX_ENTRIES: usize = 64;

    /// 包装数据源
    pub fn new(inner: &'a mut dyn ByteSource) -> Self {
        Self::with_budget(inner, Self::DEFAULT_BUDGET)
    }

    /// 包装数据源并指定缓存上限
    pub fn with_budget(inner: &'a mut dyn ByteSource, budget: usize) -> Self {
        Self {
            inner,
            entries: Vec::new(),
            used: 0,
            budget,
            hits: 0,
            misses: 0,
        }
    }

    /// 缓存命中与未命中次数
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    fn insert(&mut self, entry: CacheEntry) {
        let size = entry.data.len();
        if size > self.budget {
            return;
        }
        while (self.used + size > self.budget || self.entries.len() >= Self::MAX_ENTRIES)
            && !self.entries.is_empty()
        {
            let old = self.entries.remove(0);
            self.used -= old.data.len();
        }
        self.used += size;
        self.entries.push(entry);
    }
}

impl ByteSource for CachedSource<'_> {
    fn peek(&mut self, offset: u64, len: usize) -> Option<Bytes> {
        if let Some(hit) = self.entries.iter().rev().find_map(|e| e.lookup(offset, len)) {
            self.hits += 1;
            return Some(hit);
        }
        self.misses += 1;
        let data = self.inner.peek(offset, len)?;
        trace!("缓存未命中: offset={}, len={}, 实得 {}", offset, len, data.len());
        self.insert(CacheEntry {
            offset,
            at_eof: data.len() < len,
            data: data.clone(),
        });
        Some(data)
    }

    fn size(&self) -> Option<u64> {
        self.inner.size()
    }
}

// ========================
// HTTP 流式数据源
// ========================

#[cfg(feature = "http")]
pub use http::HttpSource;

#[cfg(feature = "http")]
mod http {
    use std::io::{self, Read};
    use std::sync::{Arc, Condvar, Mutex};

    use bytes::Bytes;
    use log::{debug, error, info};
    use tao_core::{TaoError, TaoResult};

    use super::ByteSource;

    /// 后台线程每次读取的块大小
    const CHUNK_SIZE: usize = 32 * 1024;

    /// HTTP 下载共享缓冲区
    struct HttpBuffer {
        /// 已下载的数据
        data: Vec<u8>,
        /// 总大小 (来自 Content-Length)
        total_size: Option<u64>,
        /// 下载是否已结束 (完成, 出错或到达上限)
        finished: bool,
        /// 下载错误信息
        error: Option<String>,
        /// HTTP 连接是否已建立
        connected: bool,
        /// 是否请求中止下载
        aborted: bool,
    }

    type Shared = Arc<(Mutex<HttpBuffer>, Condvar)>;

    /// HTTP 流式数据源
    ///
    /// 在后台线程中顺序下载响应体, 读取请求阻塞等待所需区间下载到位.
    /// 下载量超过 `max_download` 后停止, 之后的区间视为不可读.
    pub struct HttpSource {
        shared: Shared,
        total_size: Option<u64>,
    }

    impl HttpSource {
        /// 默认下载上限 (64 MB)
        pub const DEFAULT_MAX_DOWNLOAD: usize = 64 * 1024 * 1024;

        /// 打开 HTTP URL 并启动后台下载线程
        pub fn open(url: &str) -> TaoResult<Self> {
            Self::open_with_limit(url, Self::DEFAULT_MAX_DOWNLOAD)
        }

        /// 打开 HTTP URL, 指定下载上限
        pub fn open_with_limit(url: &str, max_download: usize) -> TaoResult<Self> {
            let shared: Shared = Arc::new((
                Mutex::new(HttpBuffer {
                    data: Vec::new(),
                    total_size: None,
                    finished: false,
                    error: None,
                    connected: false,
                    aborted: false,
                }),
                Condvar::new(),
            ));

            let worker_shared = Arc::clone(&shared);
            let url_owned = url.to_string();
            std::thread::spawn(move || {
                download_worker(&url_owned, &worker_shared, max_download);
            });

            // 等待连接建立或失败
            let (lock, cvar) = &*shared;
            let mut sb = lock.lock().map_err(|_| poisoned())?;
            while !sb.connected && !sb.finished {
                sb = cvar.wait(sb).map_err(|_| poisoned())?;
            }
            if let Some(ref err) = sb.error {
                return Err(TaoError::Io(io::Error::other(err.clone())));
            }
            let total_size = sb.total_size;
            drop(sb);

            Ok(Self { shared, total_size })
        }
    }

    fn poisoned() -> TaoError {
        TaoError::Io(io::Error::other("HTTP 下载缓冲区锁已失效"))
    }

    impl Drop for HttpSource {
        fn drop(&mut self) {
            let (lock, cvar) = &*self.shared;
            if let Ok(mut sb) = lock.lock() {
                sb.aborted = true;
                cvar.notify_all();
            }
        }
    }

    impl ByteSource for HttpSource {
        fn peek(&mut self, offset: u64, len: usize) -> Option<Bytes> {
            let start = usize::try_from(offset).ok()?;
            let want_end = start.checked_add(len)?;
            let (lock, cvar) = &*self.shared;
            let mut sb = lock.lock().ok()?;
            loop {
                if sb.data.len() >= want_end || sb.finished {
                    break;
                }
                sb = cvar.wait(sb).ok()?;
            }
            if start > sb.data.len() || (start == sb.data.len() && len > 0) {
                return None;
            }
            // 下载提前结束 (出错或到达上限) 时, 短数据不代表流末尾
            let complete = sb.error.is_none()
                && self
                    .total_size
                    .is_none_or(|size| sb.data.len() as u64 >= size);
            let end = want_end.min(sb.data.len());
            if end < want_end && !complete {
                return None;
            }
            Some(Bytes::copy_from_slice(&sb.data[start..end]))
        }

        fn size(&self) -> Option<u64> {
            self.total_size
        }
    }

    /// 后台下载工作线程
    fn download_worker(url: &str, shared: &Shared, max_download: usize) {
        let (lock, cvar) = &**shared;

        let mut response = match ureq::get(url).call() {
            Ok(resp) => resp,
            Err(e) => {
                finish(lock, cvar, Some(format!("HTTP 请求失败: {}", e)));
                return;
            }
        };

        let content_length = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let Ok(mut sb) = lock.lock() {
            sb.total_size = content_length;
            sb.connected = true;
            cvar.notify_all();
        }
        info!(
            "HTTP 连接成功{}",
            content_length.map_or(String::new(), |len| format!(", 内容大小: {} 字节", len))
        );

        let mut reader = response.body_mut().as_reader();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match lock.lock() {
                Ok(sb) if sb.aborted => {
                    debug!("HTTP 下载被中止");
                    return;
                }
                Ok(sb) if sb.data.len() >= max_download => {
                    drop(sb);
                    debug!("HTTP 下载达到上限 {} 字节, 停止", max_download);
                    finish(lock, cvar, None);
                    return;
                }
                Ok(_) => {}
                Err(_) => return,
            }

            match reader.read(&mut buf) {
                Ok(0) => {
                    finish(lock, cvar, None);
                    return;
                }
                Ok(n) => {
                    if let Ok(mut sb) = lock.lock() {
                        sb.data.extend_from_slice(&buf[..n]);
                        cvar.notify_all();
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("HTTP 下载错误: {}", e);
                    finish(lock, cvar, Some(format!("网络读取错误: {}", e)));
                    return;
                }
            }
        }
    }

    fn finish(lock: &Mutex<HttpBuffer>, cvar: &Condvar, err: Option<String>) {
        if let Ok(mut sb) = lock.lock() {
            if err.is_none() {
                debug!("HTTP 下载结束, 共 {} 字节", sb.data.len());
            }
            sb.error = err;
            sb.finished = true;
            sb.connected = true;
            cvar.notify_all();
        }
    }

}
