//! 叠加层配置 - 通过JSON文件调整参数
//!
//! 每次(重新)配置时读取一次,不按帧轮询

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::session::{DetectorModel, LensFacing};

/// 渲染标志 (由偏好设置提供)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationFlags {
    pub show_in_frame_likelihood: bool,
    pub visualize_z: bool,
    pub rescale_z_for_visualization: bool,
    pub run_classification: bool,
}

impl Default for PresentationFlags {
    fn default() -> Self {
        Self {
            show_in_frame_likelihood: true,
            visualize_z: true,
            rescale_z_for_visualization: true,
            run_classification: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// 叠加层参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    // === 渲染参数 ===
    pub flags: PresentationFlags,

    // === 相机参数 ===
    pub lens_facing: LensFacing,
    pub target_resolution_back: Option<Resolution>,
    pub target_resolution_front: Option<Resolution>,
    pub camera_live_viewport: bool,

    // === 检测器 ===
    pub selected_model: DetectorModel,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            flags: PresentationFlags::default(),
            lens_facing: LensFacing::Back,
            target_resolution_back: None,
            target_resolution_front: None,
            camera_live_viewport: true,
            selected_model: DetectorModel::ObjectDetection,
        }
    }
}

impl OverlayConfig {
    /// 从JSON文件加载配置,失败时使用默认值
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!("❌ 保存默认配置失败: {}", e);
                }
                config
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        info!("💾 配置已保存到 {}", path.as_ref().display());
        Ok(())
    }

    /// 当前朝向对应的目标分辨率
    pub fn target_resolution(&self, facing: LensFacing) -> Option<Resolution> {
        match facing {
            LensFacing::Back => self.target_resolution_back,
            LensFacing::Front => self.target_resolution_front,
        }
    }

    pub fn print_summary(&self) {
        info!("🎛️  当前叠加层配置:");
        info!("  检测模型: {}", self.selected_model);
        info!("  镜头朝向: {:?}", self.lens_facing);
        info!("  显示置信度: {}", self.flags.show_in_frame_likelihood);
        info!(
            "  深度可视化: {} (重缩放: {})",
            self.flags.visualize_z, self.flags.rescale_z_for_visualization
        );
        info!("  姿态分类: {}", self.flags.run_classification);
        if let Some(r) = self.target_resolution(self.lens_facing) {
            info!("  目标分辨率: {}x{}", r.width, r.height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = OverlayConfig::default();
        assert!(config.flags.visualize_z);
        assert!(!config.flags.run_classification);
        assert_eq!(config.lens_facing, LensFacing::Back);
        assert_eq!(config.target_resolution(LensFacing::Front), None);
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.json");
        let config = OverlayConfig::load(&path);
        assert_eq!(config, OverlayConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.json");
        fs::write(
            &path,
            r#"{"selected_model":"PoseDetection","target_resolution_front":{"width":640,"height":480}}"#,
        )
        .unwrap();

        let config = OverlayConfig::load(&path);
        assert_eq!(config.selected_model, DetectorModel::PoseDetection);
        assert_eq!(
            config.target_resolution(LensFacing::Front),
            Some(Resolution {
                width: 640,
                height: 480
            })
        );
        assert!(config.camera_live_viewport);
    }

    #[test]
    fn test_corrupt_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(OverlayConfig::load(&path), OverlayConfig::default());
    }
}
