//! Account authentication for CareLink.
//!
//! Patients and doctors sign in with email and password and receive a JWT.
//! The token names the account kind so a single validation path serves both.

use std::sync::Arc;

use carelink_config::AuthConfig;
use carelink_database::{
    timestamp_now, CreateDoctorRequest, CreatePatientRequest, DatabaseError, Doctor,
    DoctorRepository, Patient, PatientRepository, Role,
};
use chrono::{Duration, SecondsFormat};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod jwt;
pub mod mail;
pub mod password;
pub mod reset;

pub use jwt::{Claims, IssuedToken, JwtManager};
pub use mail::{mailer_from_config, Email, LogMailer, MailError, Mailer, MemoryMailer, SmtpMailer};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please provide an email and password")]
    MissingCredentials,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not authorized to access this route")]
    Unauthorized,
    #[error("Password is incorrect")]
    IncorrectPassword,
    #[error("There is no user with that email")]
    UnknownEmail,
    #[error("Invalid token")]
    InvalidResetToken,
    #[error("Role {0} cannot be chosen at registration")]
    RoleNotAllowed(Role),
    #[error("Email could not be sent")]
    MailDelivery(#[source] MailError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Patient,
    Doctor,
}

/// The account behind a validated token.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Account {
    Patient(Patient),
    Doctor(Doctor),
}

impl Account {
    pub fn kind(&self) -> AccountKind {
        match self {
            Account::Patient(_) => AccountKind::Patient,
            Account::Doctor(_) => AccountKind::Doctor,
        }
    }

    pub fn public_id(&self) -> &str {
        match self {
            Account::Patient(patient) => &patient.public_id,
            Account::Doctor(doctor) => &doctor.public_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Account::Patient(patient) => patient.role,
            Account::Doctor(doctor) => doctor.role,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Account::Patient(patient) => &patient.name,
            Account::Doctor(doctor) => &doctor.name,
        }
    }

    pub fn as_patient(&self) -> Option<&Patient> {
        match self {
            Account::Patient(patient) => Some(patient),
            Account::Doctor(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct Authenticator {
    patients: PatientRepository,
    doctors: DoctorRepository,
    jwt: Arc<JwtManager>,
    mailer: Arc<dyn Mailer>,
    reset_ttl: Duration,
    public_url: String,
}

impl Authenticator {
    pub fn new(
        pool: SqlitePool,
        config: &AuthConfig,
        mailer: Arc<dyn Mailer>,
        public_url: impl Into<String>,
    ) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_issuer.clone())
            .with_duration(Duration::days(i64::from(config.jwt_expire_days)));

        Self {
            patients: PatientRepository::new(pool.clone()),
            doctors: DoctorRepository::new(pool),
            jwt: Arc::new(jwt),
            mailer,
            reset_ttl: Duration::minutes(i64::from(config.reset_token_ttl_minutes)),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn patients(&self) -> &PatientRepository {
        &self.patients
    }

    pub fn doctors(&self) -> &DoctorRepository {
        &self.doctors
    }

    pub fn issue(&self, account: &Account) -> Result<IssuedToken, AuthError> {
        self.jwt
            .issue(account.public_id(), account.kind(), account.role().as_str())
    }

    /// Self-service registration. Only `patient` and `donationPoint` may be chosen.
    pub async fn register_patient(
        &self,
        request: &CreatePatientRequest,
    ) -> Result<(Patient, IssuedToken), AuthError> {
        let role = request.role.unwrap_or(Role::Patient);
        if !matches!(role, Role::Patient | Role::DonationPoint) {
            return Err(AuthError::RoleNotAllowed(role));
        }

        let patient = self.create_patient(request, role).await?;
        let token = self.issue(&Account::Patient(patient.clone()))?;
        info!(patient = %patient.public_id, role = %patient.role, "registered patient");
        Ok((patient, token))
    }

    /// Create a patient with any role. Reserved for admins and the CLI.
    pub async fn create_patient(
        &self,
        request: &CreatePatientRequest,
        role: Role,
    ) -> Result<Patient, AuthError> {
        request.validate()?;
        let hash = password::hash_password(&request.password)?;
        Ok(self.patients.create(request, &hash, role).await?)
    }

    pub async fn login_patient(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Patient, IssuedToken), AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let patient = self
            .patients
            .find_by_email(email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify_password(password, &patient.password_hash)? {
            debug!(patient = %patient.public_id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue(&Account::Patient(patient.clone()))?;
        Ok((patient, token))
    }

    pub async fn register_doctor(
        &self,
        request: &CreateDoctorRequest,
    ) -> Result<(Doctor, IssuedToken), AuthError> {
        request.validate()?;
        let hash = password::hash_password(&request.password)?;
        let doctor = self.doctors.create(request, &hash).await?;
        let token = self.issue(&Account::Doctor(doctor.clone()))?;
        info!(doctor = %doctor.public_id, "registered doctor");
        Ok((doctor, token))
    }

    pub async fn login_doctor(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Doctor, IssuedToken), AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let doctor = self
            .doctors
            .find_by_email(email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify_password(password, &doctor.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue(&Account::Doctor(doctor.clone()))?;
        Ok((doctor, token))
    }

    /// Resolve a bearer token to its account. Every failure is `Unauthorized`,
    /// including tokens whose account has since been deleted.
    pub async fn authenticate(&self, token: &str) -> Result<Account, AuthError> {
        let claims = self.jwt.validate(token).map_err(|err| {
            debug!(error = %err, "rejected token");
            AuthError::Unauthorized
        })?;

        let account = match claims.kind {
            AccountKind::Patient => self
                .patients
                .find_by_public_id(&claims.sub)
                .await?
                .map(Account::Patient),
            AccountKind::Doctor => self
                .doctors
                .find_by_public_id(&claims.sub)
                .await?
                .map(Account::Doctor),
        };

        account.ok_or(AuthError::Unauthorized)
    }

    pub async fn update_password(
        &self,
        patient: &Patient,
        current_password: &str,
        new_password: &str,
    ) -> Result<IssuedToken, AuthError> {
        if !password::verify_password(current_password, &patient.password_hash)? {
            return Err(AuthError::IncorrectPassword);
        }
        carelink_database::validation::password(new_password)?;

        let hash = password::hash_password(new_password)?;
        self.patients.update_password(patient.id, &hash).await?;
        self.issue(&Account::Patient(patient.clone()))
    }

    /// Mail a reset link to the patient registered under `email`.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let patient = self
            .patients
            .find_by_email(email.trim())
            .await?
            .ok_or(AuthError::UnknownEmail)?;

        let reset = reset::generate(self.reset_ttl);
        let expires = reset
            .expires_at
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        self.patients
            .set_reset_token(patient.id, Some((&reset.hash, &expires)))
            .await?;

        let reset_url = format!(
            "{}/api/v1/auth/resetpassword/{}",
            self.public_url, reset.token
        );
        let email = Email {
            to: patient.email.clone(),
            subject: "Password reset token".to_string(),
            body: format!(
                "You are receiving this email because you (or someone else) has requested the \
                 reset of a password. Please make a PUT request to: \n\n {reset_url}"
            ),
        };

        if let Err(err) = self.mailer.send(email).await {
            warn!(patient = %patient.public_id, error = %err, "reset mail failed");
            self.patients.set_reset_token(patient.id, None).await?;
            return Err(AuthError::MailDelivery(err));
        }

        info!(patient = %patient.public_id, "password reset requested");
        Ok(())
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(Patient, IssuedToken), AuthError> {
        let hash = reset::hash_token(token);
        let patient = self
            .patients
            .find_by_reset_token(&hash, &timestamp_now())
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        carelink_database::validation::password(new_password)?;
        let password_hash = password::hash_password(new_password)?;
        self.patients
            .update_password(patient.id, &password_hash)
            .await?;

        let token = self.issue(&Account::Patient(patient.clone()))?;
        info!(patient = %patient.public_id, "password reset completed");
        Ok((patient, token))
    }
}
