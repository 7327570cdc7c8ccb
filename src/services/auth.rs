// src/services/auth.rs

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use sqlx::PgPool;

use crate::{
    common::{db_utils::scoped_connection, error::AppError},
    db::{TenantRepository, UserRepository},
    models::auth::{Claims, User},
};

// Os tokens são emitidos pelo serviço de identidade; aqui só validamos.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    tenant_repo: TenantRepository,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        tenant_repo: TenantRepository,
        jwt_secret: String,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, tenant_repo, jwt_secret, pool }
    }

    /// Assinatura HS256 e expiração. Nada de banco aqui.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Token rejeitado: {}", e);
            AppError::InvalidToken
        })?;

        Ok(token_data.claims)
    }

    /// Valida o token e recarrega o usuário a cada requisição: loja e usuário
    /// precisam existir e estar ativos agora, não só quando o token foi emitido.
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_claims(token)?;

        let tenant = self
            .tenant_repo
            .find_by_id(claims.tenant_id)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if !tenant.is_active {
            return Err(AppError::TenantInactive);
        }

        let mut conn = scoped_connection(&self.pool, tenant.id, Some(claims.sub)).await?;

        let user = self
            .user_repo
            .find_by_id(&mut *conn, tenant.id, claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    const SECRET: &str = "segredo-de-teste";

    fn service() -> AuthService {
        // Pool preguiçosa: os testes abaixo nunca chegam ao banco.
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        AuthService::new(
            UserRepository::new(),
            TenantRepository::new(pool.clone()),
            SECRET.to_string(),
            pool,
        )
    }

    fn token(secret: &str, exp_offset: i64) -> (String, Uuid, Uuid) {
        let sub = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub,
            tenant_id,
            exp: (now + exp_offset) as usize,
            iat: now as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .unwrap();
        (token, sub, tenant_id)
    }

    #[tokio::test]
    async fn accepts_a_token_signed_with_the_shared_secret() {
        let (token, sub, tenant_id) = token(SECRET, 3600);
        let claims = service().decode_claims(&token).unwrap();
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.tenant_id, tenant_id);
    }

    #[tokio::test]
    async fn rejects_wrong_signature_and_expired_tokens() {
        let svc = service();

        let (forged, _, _) = token("outro-segredo", 3600);
        assert!(matches!(svc.decode_claims(&forged), Err(AppError::InvalidToken)));

        let (expired, _, _) = token(SECRET, -3600);
        assert!(matches!(svc.decode_claims(&expired), Err(AppError::InvalidToken)));

        assert!(matches!(svc.decode_claims("nao.e.jwt"), Err(AppError::InvalidToken)));
    }
}
