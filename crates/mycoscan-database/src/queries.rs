//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use mycoscan_core::{Medication, MycoscanError, Patient, Result, Scan};

/// 数据库查询操作接口
pub struct DatabaseQueries<'a> {
    pool: &'a DatabasePool,
}

impl<'a> DatabaseQueries<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        // 创建患者表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS patients (
                id SERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                age INTEGER NOT NULL,
                sex VARCHAR(10) NOT NULL,
                condition VARCHAR(120) NOT NULL DEFAULT 'Not set',
                severity VARCHAR(50) NOT NULL DEFAULT 'Mild',
                last_visit VARCHAR(50) NOT NULL DEFAULT 'Today'
            )
        "#).execute(pool).await.map_err(|e| MycoscanError::Database(e.to_string()))?;

        // 创建药品表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS medications (
                id SERIAL PRIMARY KEY,
                name VARCHAR(120) NOT NULL,
                type VARCHAR(120) NOT NULL,
                stock INTEGER NOT NULL,
                image_filename VARCHAR(200)
            )
        "#).execute(pool).await.map_err(|e| MycoscanError::Database(e.to_string()))?;

        // 创建扫描表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS scans (
                id SERIAL PRIMARY KEY,
                patient_name VARCHAR(100) NOT NULL,
                notes TEXT,
                image_filename VARCHAR(200) NOT NULL,
                condition VARCHAR(40) NOT NULL DEFAULT 'Onychomycosis',
                severity VARCHAR(20) NOT NULL DEFAULT 'Mild',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                analyzed BOOLEAN NOT NULL DEFAULT FALSE
            )
        "#).execute(pool).await.map_err(|e| MycoscanError::Database(e.to_string()))?;

        // 创建索引以优化查询性能
        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let pool = self.pool.pool();

        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name)",
            "CREATE INDEX IF NOT EXISTS idx_medications_name ON medications(name)",
            "CREATE INDEX IF NOT EXISTS idx_scans_patient_name ON scans(patient_name)",
            "CREATE INDEX IF NOT EXISTS idx_scans_created_at ON scans(created_at)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql)
                .execute(pool)
                .await
                .map_err(|e| MycoscanError::Database(e.to_string()))?;
        }

        tracing::info!("Database indexes created successfully");
        Ok(())
    }

    // ========== 患者相关操作 ==========

    /// 创建新患者
    pub async fn create_patient(&self, patient: &NewPatient) -> Result<Patient> {
        let pool = self.pool.pool();

        let row = sqlx::query_as::<_, DbPatient>(r#"
            INSERT INTO patients (name, age, sex, condition, severity, last_visit)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        "#)
        .bind(&patient.name)
        .bind(patient.age)
        .bind(&patient.sex)
        .bind(&patient.condition)
        .bind(&patient.severity)
        .bind(&patient.last_visit)
        .fetch_one(pool)
        .await
        .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(Patient::from(row))
    }

    /// 获取全部患者，按主键升序
    pub async fn list_patients(&self) -> Result<Vec<Patient>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients ORDER BY id"
        )
        .fetch_all(pool)
        .await
        .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Patient::from).collect())
    }

    /// 根据ID查找患者
    pub async fn get_patient_by_id(&self, id: i32) -> Result<Option<Patient>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbPatient>(
            "SELECT * FROM patients WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(result.map(Patient::from))
    }

    /// 更新患者，缺省字段保留现有值
    pub async fn update_patient(&self, id: i32, update: &PatientUpdate) -> Result<Option<Patient>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbPatient>(r#"
            UPDATE patients
            SET last_visit = COALESCE($1, last_visit),
                condition = COALESCE($2, condition),
                severity = COALESCE($3, severity)
            WHERE id = $4
            RETURNING *
        "#)
        .bind(&update.last_visit)
        .bind(&update.condition)
        .bind(&update.severity)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(result.map(Patient::from))
    }

    /// 删除患者，返回是否存在
    pub async fn delete_patient(&self, id: i32) -> Result<bool> {
        let pool = self.pool.pool();

        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    // ========== 药品相关操作 ==========

    /// 创建新药品，image_filename 初始为空
    pub async fn create_medication(&self, medication: &NewMedication) -> Result<Medication> {
        let pool = self.pool.pool();

        let row = sqlx::query_as::<_, DbMedication>(r#"
            INSERT INTO medications (name, type, stock)
            VALUES ($1, $2, $3)
            RETURNING *
        "#)
        .bind(&medication.name)
        .bind(&medication.kind)
        .bind(medication.stock)
        .fetch_one(pool)
        .await
        .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(Medication::from(row))
    }

    /// 获取全部药品，按主键升序
    pub async fn list_medications(&self) -> Result<Vec<Medication>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbMedication>(
            "SELECT * FROM medications ORDER BY id"
        )
        .fetch_all(pool)
        .await
        .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Medication::from).collect())
    }

    /// 根据ID查找药品
    pub async fn get_medication_by_id(&self, id: i32) -> Result<Option<Medication>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbMedication>(
            "SELECT * FROM medications WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(result.map(Medication::from))
    }

    /// 更新药品，三个字段整体替换
    pub async fn update_medication(
        &self,
        id: i32,
        update: &MedicationUpdate,
    ) -> Result<Option<Medication>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbMedication>(r#"
            UPDATE medications
            SET name = $1, type = $2, stock = $3
            WHERE id = $4
            RETURNING *
        "#)
        .bind(&update.name)
        .bind(&update.kind)
        .bind(update.stock)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(result.map(Medication::from))
    }

    /// 记录药品图片的存储文件名
    pub async fn set_medication_image(
        &self,
        id: i32,
        image_filename: &str,
    ) -> Result<Option<Medication>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbMedication>(r#"
            UPDATE medications
            SET image_filename = $1
            WHERE id = $2
            RETURNING *
        "#)
        .bind(image_filename)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(result.map(Medication::from))
    }

    /// 删除药品，返回是否存在
    ///
    /// 不清理已上传的图片文件，磁盘上可能遗留孤儿文件。
    pub async fn delete_medication(&self, id: i32) -> Result<bool> {
        let pool = self.pool.pool();

        let result = sqlx::query("DELETE FROM medications WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    // ========== 扫描相关操作 ==========

    /// 创建新扫描记录，created_at 由数据库在插入时刻生成
    pub async fn create_scan(&self, scan: &NewScan) -> Result<Scan> {
        let pool = self.pool.pool();

        let row = sqlx::query_as::<_, DbScan>(r#"
            INSERT INTO scans (patient_name, notes, image_filename, condition, severity, analyzed)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        "#)
        .bind(&scan.patient_name)
        .bind(&scan.notes)
        .bind(&scan.image_filename)
        .bind(&scan.condition)
        .bind(&scan.severity)
        .bind(scan.analyzed)
        .fetch_one(pool)
        .await
        .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(Scan::from(row))
    }

    /// 获取全部扫描记录，按主键升序
    pub async fn list_scans(&self) -> Result<Vec<Scan>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbScan>(
            "SELECT * FROM scans ORDER BY id"
        )
        .fetch_all(pool)
        .await
        .map_err(|e| MycoscanError::Database(e.to_string()))?;

        Ok(results.into_iter().map(Scan::from).collect())
    }
}
