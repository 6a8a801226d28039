//! 数据库模型

use chrono::{DateTime, Utc};
use mycoscan_core::models::*;
use sqlx::FromRow;

// 数据库表模型 - 使用FromRow trait用于SQL查询

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub sex: String,
    pub condition: String,
    pub severity: String,
    pub last_visit: String,
}

impl From<DbPatient> for Patient {
    fn from(db_patient: DbPatient) -> Self {
        Patient {
            id: db_patient.id,
            name: db_patient.name,
            age: db_patient.age,
            sex: db_patient.sex,
            condition: db_patient.condition,
            severity: db_patient.severity,
            last_visit: db_patient.last_visit,
        }
    }
}

/// 数据库药品表
#[derive(Debug, FromRow)]
pub struct DbMedication {
    pub id: i32,
    pub name: String,
    #[sqlx(rename = "type")]
    pub kind: String, // 列名为 "type"
    pub stock: i32,
    pub image_filename: Option<String>,
}

impl From<DbMedication> for Medication {
    fn from(db_medication: DbMedication) -> Self {
        Medication {
            id: db_medication.id,
            name: db_medication.name,
            kind: db_medication.kind,
            stock: db_medication.stock,
            image_filename: db_medication.image_filename,
        }
    }
}

/// 数据库扫描表
#[derive(Debug, FromRow)]
pub struct DbScan {
    pub id: i32,
    pub patient_name: String,
    pub notes: Option<String>,
    pub image_filename: String,
    pub condition: String,
    pub severity: String,
    pub created_at: DateTime<Utc>,
    pub analyzed: bool,
}

impl From<DbScan> for Scan {
    fn from(db_scan: DbScan) -> Self {
        Scan {
            id: db_scan.id,
            patient_name: db_scan.patient_name,
            notes: db_scan.notes,
            image_filename: db_scan.image_filename,
            condition: db_scan.condition,
            severity: db_scan.severity,
            created_at: db_scan.created_at,
            analyzed: db_scan.analyzed,
        }
    }
}

// 插入模型 - 用于创建新记录，id由数据库分配

/// 新患者插入模型
#[derive(Debug)]
pub struct NewPatient {
    pub name: String,
    pub age: i32,
    pub sex: String,
    pub condition: String,
    pub severity: String,
    pub last_visit: String,
}

/// 新药品插入模型
#[derive(Debug)]
pub struct NewMedication {
    pub name: String,
    pub kind: String,
    pub stock: i32,
}

/// 新扫描插入模型
#[derive(Debug)]
pub struct NewScan {
    pub patient_name: String,
    pub notes: Option<String>,
    pub image_filename: String,
    pub condition: String,
    pub severity: String,
    pub analyzed: bool,
}

// 更新模型

/// 患者更新模型
///
/// 缺省字段保留数据库中的现有值（合并语义）。
#[derive(Debug, Default)]
pub struct PatientUpdate {
    pub last_visit: Option<String>,
    pub condition: Option<String>,
    pub severity: Option<String>,
}

/// 药品更新模型
///
/// 三个字段整体替换现有记录，不做字段级合并。
#[derive(Debug)]
pub struct MedicationUpdate {
    pub name: String,
    pub kind: String,
    pub stock: i32,
}
