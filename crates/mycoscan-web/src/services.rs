//! 实体服务层
//!
//! 每种实体一个服务：校验请求载荷、填充默认值，并编排数据库
//! 与上传存储的调用。

use mycoscan_core::{
    Medication, MycoscanError, Patient, Result, Scan, DEFAULT_PATIENT_CONDITION,
    DEFAULT_PATIENT_LAST_VISIT, DEFAULT_PATIENT_SEVERITY, DEFAULT_SCAN_CONDITION,
    DEFAULT_SCAN_SEVERITY,
};
use mycoscan_database::{
    DatabasePool, DatabaseQueries, MedicationUpdate, NewMedication, NewPatient, NewScan,
    PatientUpdate,
};
use mycoscan_storage::StorageManager;
use serde::Deserialize;

/// multipart请求中提取的上传文件
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

// ========== 请求载荷 ==========

/// 患者创建请求
///
/// 载荷中的 condition/severity/last_visit 等多余字段会被忽略，
/// 创建时一律写入默认值。
#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub name: String,
    pub age: i32,
    pub sex: String,
}

impl CreatePatientRequest {
    /// 校验并转换为插入模型
    pub fn into_new_patient(self) -> Result<NewPatient> {
        if self.name.trim().is_empty() {
            return Err(MycoscanError::Validation(
                "Patient name must not be empty".to_string(),
            ));
        }
        if self.age < 0 {
            return Err(MycoscanError::Validation(
                "Patient age must be non-negative".to_string(),
            ));
        }

        Ok(NewPatient {
            name: self.name,
            age: self.age,
            sex: self.sex,
            condition: DEFAULT_PATIENT_CONDITION.to_string(),
            severity: DEFAULT_PATIENT_SEVERITY.to_string(),
            last_visit: DEFAULT_PATIENT_LAST_VISIT.to_string(),
        })
    }
}

/// 患者更新请求，仅这三个字段可变
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePatientRequest {
    pub last_visit: Option<String>,
    pub condition: Option<String>,
    pub severity: Option<String>,
}

impl UpdatePatientRequest {
    pub fn into_update(self) -> PatientUpdate {
        PatientUpdate {
            last_visit: self.last_visit,
            condition: self.condition,
            severity: self.severity,
        }
    }
}

/// 药品创建/更新请求，三个字段均为必填
#[derive(Debug, Deserialize)]
pub struct MedicationRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub stock: i32,
}

/// 扫描创建表单，由multipart字段收集而来
#[derive(Debug, Default)]
pub struct ScanForm {
    pub patient_name: Option<String>,
    pub notes: Option<String>,
    pub image: Option<UploadedFile>,
}

impl ScanForm {
    /// 校验必填字段，返回 (patient_name, notes, image)
    pub fn into_parts(self) -> Result<(String, Option<String>, UploadedFile)> {
        match (
            self.patient_name.filter(|name| !name.trim().is_empty()),
            self.image,
        ) {
            (Some(patient_name), Some(image)) => Ok((patient_name, self.notes, image)),
            _ => Err(MycoscanError::Validation(
                "Missing patient name or image".to_string(),
            )),
        }
    }
}

// ========== 患者服务 ==========

pub struct PatientService<'a> {
    db: DatabaseQueries<'a>,
}

impl<'a> PatientService<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self {
            db: DatabaseQueries::new(pool),
        }
    }

    pub async fn list(&self) -> Result<Vec<Patient>> {
        self.db.list_patients().await
    }

    pub async fn create(&self, request: CreatePatientRequest) -> Result<Patient> {
        let new_patient = request.into_new_patient()?;
        self.db.create_patient(&new_patient).await
    }

    /// 合并更新：载荷中缺省的字段保留现有值
    pub async fn update(&self, id: i32, request: UpdatePatientRequest) -> Result<Patient> {
        self.db
            .update_patient(id, &request.into_update())
            .await?
            .ok_or_else(|| MycoscanError::NotFound(format!("Patient {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        if self.db.delete_patient(id).await? {
            Ok(())
        } else {
            Err(MycoscanError::NotFound(format!("Patient {} not found", id)))
        }
    }
}

// ========== 药品服务 ==========

pub struct MedicationService<'a> {
    db: DatabaseQueries<'a>,
    storage: &'a StorageManager,
}

impl<'a> MedicationService<'a> {
    pub fn new(pool: &'a DatabasePool, storage: &'a StorageManager) -> Self {
        Self {
            db: DatabaseQueries::new(pool),
            storage,
        }
    }

    pub async fn list(&self) -> Result<Vec<Medication>> {
        self.db.list_medications().await
    }

    pub async fn create(&self, request: MedicationRequest) -> Result<Medication> {
        self.db
            .create_medication(&NewMedication {
                name: request.name,
                kind: request.kind,
                stock: request.stock,
            })
            .await
    }

    /// 整体替换更新：name/type/stock 全部重写
    pub async fn update(&self, id: i32, request: MedicationRequest) -> Result<Medication> {
        self.db
            .update_medication(
                id,
                &MedicationUpdate {
                    name: request.name,
                    kind: request.kind,
                    stock: request.stock,
                },
            )
            .await?
            .ok_or_else(|| MycoscanError::NotFound(format!("Medication {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        if self.db.delete_medication(id).await? {
            Ok(())
        } else {
            Err(MycoscanError::NotFound(format!(
                "Medication {} not found",
                id
            )))
        }
    }

    /// 为已有药品附加图片
    ///
    /// 存在性检查先于任何文件写入；缺少文件时返回验证错误。
    pub async fn attach_image(&self, id: i32, image: Option<UploadedFile>) -> Result<Medication> {
        if self.db.get_medication_by_id(id).await?.is_none() {
            return Err(MycoscanError::NotFound(format!(
                "Medication {} not found",
                id
            )));
        }

        let image = image
            .ok_or_else(|| MycoscanError::Validation("No image provided".to_string()))?;

        let filename = self.storage.store_upload(&image.filename, &image.data).await?;

        self.db
            .set_medication_image(id, &filename)
            .await?
            .ok_or_else(|| MycoscanError::NotFound(format!("Medication {} not found", id)))
    }
}

// ========== 扫描服务 ==========

pub struct ScanService<'a> {
    db: DatabaseQueries<'a>,
    storage: &'a StorageManager,
}

impl<'a> ScanService<'a> {
    pub fn new(pool: &'a DatabasePool, storage: &'a StorageManager) -> Self {
        Self {
            db: DatabaseQueries::new(pool),
            storage,
        }
    }

    pub async fn list(&self) -> Result<Vec<Scan>> {
        self.db.list_scans().await
    }

    /// 创建扫描记录：先落盘图片，再写数据库
    pub async fn create(&self, form: ScanForm) -> Result<Scan> {
        let (patient_name, notes, image) = form.into_parts()?;

        let filename = self.storage.store_upload(&image.filename, &image.data).await?;

        self.db
            .create_scan(&NewScan {
                patient_name,
                notes,
                image_filename: filename,
                condition: DEFAULT_SCAN_CONDITION.to_string(),
                severity: DEFAULT_SCAN_SEVERITY.to_string(),
                analyzed: false,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_patient_applies_defaults() {
        let request = CreatePatientRequest {
            name: "Jane Doe".to_string(),
            age: 34,
            sex: "F".to_string(),
        };

        let new_patient = request.into_new_patient().unwrap();
        assert_eq!(new_patient.condition, "Not set");
        assert_eq!(new_patient.severity, "Mild");
        assert_eq!(new_patient.last_visit, "Today");
    }

    #[test]
    fn test_create_patient_ignores_supplied_condition_fields() {
        // 载荷携带 condition/severity/last_visit 也会被丢弃
        let request: CreatePatientRequest = serde_json::from_str(
            r#"{"name":"Jane Doe","age":34,"sex":"F","condition":"Severe fungus","severity":"Severe","last_visit":"2023-01-01"}"#,
        )
        .unwrap();

        let new_patient = request.into_new_patient().unwrap();
        assert_eq!(new_patient.condition, "Not set");
        assert_eq!(new_patient.severity, "Mild");
        assert_eq!(new_patient.last_visit, "Today");
    }

    #[test]
    fn test_create_patient_rejects_empty_name() {
        let request = CreatePatientRequest {
            name: "   ".to_string(),
            age: 20,
            sex: "M".to_string(),
        };

        assert!(matches!(
            request.into_new_patient(),
            Err(MycoscanError::Validation(_))
        ));
    }

    #[test]
    fn test_create_patient_rejects_negative_age() {
        let request = CreatePatientRequest {
            name: "John".to_string(),
            age: -1,
            sex: "M".to_string(),
        };

        assert!(matches!(
            request.into_new_patient(),
            Err(MycoscanError::Validation(_))
        ));
    }

    #[test]
    fn test_update_patient_request_partial_fields() {
        let request: UpdatePatientRequest =
            serde_json::from_str(r#"{"severity":"Severe"}"#).unwrap();

        let update = request.into_update();
        assert_eq!(update.severity.as_deref(), Some("Severe"));
        assert!(update.last_visit.is_none());
        assert!(update.condition.is_none());
    }

    #[test]
    fn test_medication_request_requires_all_fields() {
        // stock 缺失时反序列化失败，映射为400
        let result: std::result::Result<MedicationRequest, _> =
            serde_json::from_str(r#"{"name":"Terbinafine","type":"Tablet"}"#);
        assert!(result.is_err());

        let request: MedicationRequest =
            serde_json::from_str(r#"{"name":"Terbinafine","type":"Tablet","stock":10}"#).unwrap();
        assert_eq!(request.kind, "Tablet");
        assert_eq!(request.stock, 10);
    }

    #[test]
    fn test_scan_form_requires_patient_name_and_image() {
        let missing_image = ScanForm {
            patient_name: Some("Jane Doe".to_string()),
            notes: None,
            image: None,
        };
        assert!(matches!(
            missing_image.into_parts(),
            Err(MycoscanError::Validation(_))
        ));

        let missing_name = ScanForm {
            patient_name: None,
            notes: Some("left toe".to_string()),
            image: Some(UploadedFile {
                filename: "scan.png".to_string(),
                data: vec![1, 2, 3],
            }),
        };
        assert!(matches!(
            missing_name.into_parts(),
            Err(MycoscanError::Validation(_))
        ));

        let empty_name = ScanForm {
            patient_name: Some("".to_string()),
            notes: None,
            image: Some(UploadedFile {
                filename: "scan.png".to_string(),
                data: vec![1, 2, 3],
            }),
        };
        assert!(empty_name.into_parts().is_err());
    }

    #[test]
    fn test_scan_form_complete() {
        let form = ScanForm {
            patient_name: Some("Jane Doe".to_string()),
            notes: Some("left big toe".to_string()),
            image: Some(UploadedFile {
                filename: "scan.png".to_string(),
                data: vec![1, 2, 3],
            }),
        };

        let (patient_name, notes, image) = form.into_parts().unwrap();
        assert_eq!(patient_name, "Jane Doe");
        assert_eq!(notes.as_deref(), Some("left big toe"));
        assert_eq!(image.filename, "scan.png");
    }
}
