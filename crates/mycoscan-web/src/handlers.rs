//! HTTP处理器

use axum::{
    extract::{multipart::MultipartError, FromRequest, Multipart, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use mycoscan_core::{MycoscanError, Medication, Patient, Scan};
use mycoscan_storage::StorageManager;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::server::AppState;
use crate::services::{
    CreatePatientRequest, MedicationRequest, MedicationService, PatientService, ScanForm,
    ScanService, UpdatePatientRequest, UploadedFile,
};

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "MycoScan API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "patients": "/api/patients",
            "medications": "/api/medications",
            "scans": "/api/scans"
        }
    }))
}

/// 健康检查处理器
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ========== 患者接口 ==========

/// 患者列表
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Patient>>> {
    let patients = PatientService::new(&state.db).list().await?;
    Ok(Json(patients))
}

/// 创建患者，响应返回完整新记录
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CreatePatientRequest>,
) -> ApiResult<Json<Patient>> {
    let patient = PatientService::new(&state.db).create(request).await?;
    info!("Created patient {} ({})", patient.id, patient.name);
    Ok(Json(patient))
}

/// 更新患者（合并语义），响应返回完整记录
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    ApiJson(request): ApiJson<UpdatePatientRequest>,
) -> ApiResult<Json<Patient>> {
    let patient = PatientService::new(&state.db).update(id, request).await?;
    Ok(Json(patient))
}

/// 删除患者
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    PatientService::new(&state.db).delete(id).await?;
    Ok(Json(json!({ "message": "Patient deleted successfully" })))
}

// ========== 药品接口 ==========

/// 药品列表，附带派生的 image_url
pub async fn list_medications(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Value>> {
    let medications = MedicationService::new(&state.db, &state.storage).list().await?;
    Ok(Json(Value::Array(
        medications.iter().map(medication_json).collect(),
    )))
}

/// 创建药品，image_url 初始为 null
pub async fn create_medication(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<MedicationRequest>,
) -> ApiResult<Json<Value>> {
    let medication = MedicationService::new(&state.db, &state.storage)
        .create(request)
        .await?;
    info!("Created medication {} ({})", medication.id, medication.name);
    Ok(Json(medication_json(&medication)))
}

/// 更新药品（整体替换）
///
/// 响应只回显 name/type/stock，不含 image_url。
pub async fn update_medication(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    ApiJson(request): ApiJson<MedicationRequest>,
) -> ApiResult<Json<Value>> {
    let medication = MedicationService::new(&state.db, &state.storage)
        .update(id, request)
        .await?;
    Ok(Json(json!({
        "id": medication.id,
        "name": medication.name,
        "type": medication.kind,
        "stock": medication.stock,
    })))
}

/// 删除药品
pub async fn delete_medication(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    MedicationService::new(&state.db, &state.storage).delete(id).await?;
    Ok(Json(json!({ "message": "Medication deleted successfully" })))
}

/// 上传药品图片（multipart字段 image）
pub async fn upload_medication_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut image = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(multipart_error)?;
            image = Some(UploadedFile {
                filename,
                data: data.to_vec(),
            });
        }
    }

    MedicationService::new(&state.db, &state.storage)
        .attach_image(id, image)
        .await?;
    Ok(Json(json!({ "message": "Image uploaded successfully" })))
}

// ========== 扫描接口 ==========

/// 扫描记录列表
pub async fn list_scans(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let scans = ScanService::new(&state.db, &state.storage).list().await?;
    Ok(Json(Value::Array(scans.iter().map(scan_json).collect())))
}

/// 创建扫描记录（multipart字段 patient_name, notes?, image）
pub async fn create_scan(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut form = ScanForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "patient_name" => {
                form.patient_name = Some(field.text().await.map_err(multipart_error)?);
            }
            "notes" => {
                form.notes = Some(field.text().await.map_err(multipart_error)?);
            }
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                form.image = Some(UploadedFile {
                    filename,
                    data: data.to_vec(),
                });
            }
            _ => {}
        }
    }

    let scan = ScanService::new(&state.db, &state.storage).create(form).await?;
    info!("Saved scan {} for {}", scan.id, scan.patient_name);
    Ok(Json(json!({
        "message": format!("Scan saved for {}", scan.patient_name),
        "image_url": StorageManager::public_url(&scan.image_filename),
    })))
}

// ========== 序列化辅助 ==========

/// 药品JSON视图，image_url 由存储文件名派生
fn medication_json(medication: &Medication) -> Value {
    json!({
        "id": medication.id,
        "name": medication.name,
        "type": medication.kind,
        "stock": medication.stock,
        "image_url": medication
            .image_filename
            .as_deref()
            .map(StorageManager::public_url),
    })
}

/// 扫描JSON视图
fn scan_json(scan: &Scan) -> Value {
    json!({
        "id": scan.id,
        "patient_name": scan.patient_name,
        "notes": scan.notes,
        "image_url": StorageManager::public_url(&scan.image_filename),
        "condition": scan.condition,
        "severity": scan.severity,
        "analyzed": scan.analyzed,
        "created_at": scan.created_at,
    })
}

// ========== 错误处理 ==========

/// 处理器统一结果类型
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// API错误包装，负责错误到HTTP状态码的映射
pub struct ApiError(pub MycoscanError);

impl From<MycoscanError> for ApiError {
    fn from(err: MycoscanError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            MycoscanError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            MycoscanError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            MycoscanError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            MycoscanError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError(MycoscanError::Validation(err.to_string()))
}

/// JSON请求体提取器
///
/// 缺字段或格式错误的请求体映射为400，而不是axum默认的422。
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError(MycoscanError::Validation(rejection.body_text())))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (MycoscanError::Validation("bad".to_string()), StatusCode::BAD_REQUEST),
            (MycoscanError::NotFound("gone".to_string()), StatusCode::NOT_FOUND),
            (MycoscanError::Database("down".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
            (MycoscanError::Storage("disk full".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
            (MycoscanError::Internal("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = ApiError(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_medication_json_derives_image_url() {
        let without_image = Medication {
            id: 1,
            name: "Terbinafine".to_string(),
            kind: "Tablet".to_string(),
            stock: 10,
            image_filename: None,
        };
        let value = medication_json(&without_image);
        assert_eq!(value["type"], "Tablet");
        assert!(value["image_url"].is_null());

        let with_image = Medication {
            image_filename: Some("box.png".to_string()),
            ..without_image
        };
        let value = medication_json(&with_image);
        assert_eq!(value["image_url"], "/static/uploads/scans/box.png");
    }
}
