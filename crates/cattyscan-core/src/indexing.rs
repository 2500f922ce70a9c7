//! "已浏览内容" 登记能力
//!
//! 在内容可见时向索引服务登记一条 "viewed" 动作，不可见时撤回。
//! 这不是真实的索引集成：动作携带的是占位标题和 URL，随组件可见性
//! 连接/断开。包装成可注入的能力对象，方便用替身验证调用顺序。

use std::sync::Arc;

use anyhow::Result;
use log::info;

// TODO: 等有真实的内容页面后替换成正式 URL
const ACTION_TITLE: &str = "Main Page";
const ACTION_URL: &str = "http://cattyscan.invalid/main";

/// 一条 "viewed" 动作描述
#[derive(Debug, Clone, PartialEq)]
pub struct ViewAction {
    pub title: String,
    pub url: String,
}

impl ViewAction {
    /// 默认的主页面动作（占位内容）
    pub fn main_page() -> Self {
        Self {
            title: ACTION_TITLE.to_string(),
            url: ACTION_URL.to_string(),
        }
    }
}

/// 索引登记能力
#[async_trait::async_trait]
pub trait IndexingApi: Send + Sync {
    async fn connect(&self) -> Result<()>;
    async fn start(&self, action: &ViewAction) -> Result<()>;
    async fn end(&self, action: &ViewAction) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
}

/// 只写日志的实现
pub struct LogIndexer;

#[async_trait::async_trait]
impl IndexingApi for LogIndexer {
    async fn connect(&self) -> Result<()> {
        info!("Indexing client connected");
        Ok(())
    }

    async fn start(&self, action: &ViewAction) -> Result<()> {
        info!("Indexing action started: '{}' ({})", action.title, action.url);
        Ok(())
    }

    async fn end(&self, action: &ViewAction) -> Result<()> {
        info!("Indexing action ended: '{}' ({})", action.title, action.url);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        info!("Indexing client disconnected");
        Ok(())
    }
}

/// 可见性生命周期
///
/// 可见时先 connect 再 start，隐藏时先 end 再 disconnect，
/// 顺序与调用方的可见性转换一一对应。
pub struct VisibilitySession {
    api: Arc<dyn IndexingApi>,
    action: ViewAction,
}

impl VisibilitySession {
    pub fn new(api: Arc<dyn IndexingApi>, action: ViewAction) -> Self {
        Self { api, action }
    }

    /// 组件转为可见
    pub async fn visible(&self) -> Result<()> {
        self.api.connect().await?;
        self.api.start(&self.action).await?;
        Ok(())
    }

    /// 组件转为不可见
    pub async fn hidden(&self) -> Result<()> {
        self.api.end(&self.action).await?;
        self.api.disconnect().await?;
        Ok(())
    }
}
