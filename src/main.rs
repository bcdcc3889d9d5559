//! SceneWatch 演示程序
//!
//! 用法: `scenewatch [config.yaml]`
//!
//! 构建一棵内存场景树，观察它并把每个事件输出为一行 JSON。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use scenewatch::{logging, LoggingObserver, MemoryTree, ObserverConfig, TreeObserver};

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            ObserverConfig::load(&path).with_context(|| format!("加载配置失败: {:?}", path))?
        }
        None => ObserverConfig::default(),
    };
    logging::init(&config.logging);

    let tree = MemoryTree::new();
    let workspace = tree.create("Workspace");
    let lighting = tree.create_child(workspace, "Lighting")?;

    let observer = TreeObserver::with_config(tree.clone(), workspace, &config)?;
    observer.register(Arc::new(LoggingObserver))?;
    observer
        .on_any()
        .connect(|event| match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::error!("[Demo] 事件序列化失败: {}", e),
        })
        .detach();

    let model = tree.create_child(workspace, "Model")?;
    let part = tree.create_child(model, "Part")?;
    tree.set_property(part, "Color", "Bright red")?;
    tree.rename(lighting, "Sky")?;

    observer.set_active(false);
    tree.create_child(workspace, "Hidden")?;
    observer.set_active(true);

    tree.detach(part)?;
    tree.detach(model)?;

    tracing::info!(
        "[Demo] 结束前仍在跟踪 {} 个节点 (mode={})",
        observer.tracked_count(),
        observer.mode()
    );
    observer.destroy();
    Ok(())
}
