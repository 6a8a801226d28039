//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 患者创建时的默认病情
pub const DEFAULT_PATIENT_CONDITION: &str = "Not set";
/// 患者创建时的默认严重程度
pub const DEFAULT_PATIENT_SEVERITY: &str = "Mild";
/// 患者创建时的默认最近就诊标签
pub const DEFAULT_PATIENT_LAST_VISIT: &str = "Today";
/// 扫描记录的默认病情
pub const DEFAULT_SCAN_CONDITION: &str = "Onychomycosis";
/// 扫描记录的默认严重程度
pub const DEFAULT_SCAN_SEVERITY: &str = "Mild";

/// 患者基本信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i32,
    pub name: String,        // 患者姓名
    pub age: i32,            // 年龄
    pub sex: String,         // 性别
    pub condition: String,   // 病情，创建时固定为默认值
    pub severity: String,    // 严重程度
    pub last_visit: String,  // 最近就诊标签（自由文本）
}

/// 药品库存信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,                     // 药品类型，JSON字段名为 "type"
    pub stock: i32,                       // 库存数量
    pub image_filename: Option<String>,   // 已上传图片的存储文件名
}

/// 诊断扫描记录
///
/// patient_name 为自由文本，不与 Patient.id 建立外键关联。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    pub id: i32,
    pub patient_name: String,
    pub notes: Option<String>,
    pub image_filename: String,   // 创建时必须携带图片
    pub condition: String,
    pub severity: String,
    pub created_at: DateTime<Utc>,
    pub analyzed: bool,           // 被动元数据，本系统不做图像分析
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medication_kind_serializes_as_type() {
        let med = Medication {
            id: 1,
            name: "Terbinafine".to_string(),
            kind: "Tablet".to_string(),
            stock: 10,
            image_filename: None,
        };

        let value = serde_json::to_value(&med).unwrap();
        assert_eq!(value["type"], "Tablet");
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn test_medication_kind_deserializes_from_type() {
        let med: Medication = serde_json::from_str(
            r#"{"id":2,"name":"Itraconazole","type":"Capsule","stock":5,"image_filename":"box.png"}"#,
        )
        .unwrap();

        assert_eq!(med.kind, "Capsule");
        assert_eq!(med.image_filename.as_deref(), Some("box.png"));
    }
}
