//! User identity bridge
//!
//! Orchestrates the operations that must stay consistent between the local
//! user store and the Keycloak realm. There is no distributed transaction:
//! external mutations run first and the local write only commits after they
//! succeed, so a failure can never leave a removed local record behind a
//! still-active Keycloak account. External operations are idempotent, which
//! makes caller-driven retry safe.

use crate::domain::{CreateUserInput, Gov, UpdateUserInput, User};
use crate::error::{AppError, Result};
use crate::keycloak::KeycloakClient;
use crate::repository::{AddressRepository, GovRepository, UserRepository};
use crate::security::{Principal, ADMIN_AUTHORITY, RECOGNIZED_CLIENTS};
use crate::storage::ObjectStore;
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

pub struct UserService<R: UserRepository, A: AddressRepository, G: GovRepository> {
    repo: Arc<R>,
    address_repo: Arc<A>,
    gov_repo: Arc<G>,
    keycloak: Arc<KeycloakClient>,
    storage: Arc<dyn ObjectStore>,
}

impl<R: UserRepository, A: AddressRepository, G: GovRepository> UserService<R, A, G> {
    pub fn new(
        repo: Arc<R>,
        address_repo: Arc<A>,
        gov_repo: Arc<G>,
        keycloak: Arc<KeycloakClient>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            repo,
            address_repo,
            gov_repo,
            keycloak,
            storage,
        }
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub async fn get_by_keycloak_id(&self, keycloak_id: &str) -> Result<User> {
        self.repo
            .find_by_keycloak_id(keycloak_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Resolve "who is calling" from the request principal. The single choke
    /// point every authenticated business operation goes through.
    pub async fn resolve_current_user(&self, principal: Option<&Principal>) -> Result<User> {
        let principal =
            principal.ok_or_else(|| AppError::Unauthorized("No authenticated user".to_string()))?;
        self.get_by_keycloak_id(&principal.subject).await
    }

    pub async fn create(&self, input: CreateUserInput) -> Result<User> {
        input.validate()?;

        if input.id.is_some() {
            return Err(AppError::BadRequest(
                "A new user cannot already have an ID".to_string(),
            ));
        }
        if input.keycloak_id.is_empty() {
            return Err(AppError::BadRequest("Keycloak ID is required".to_string()));
        }
        if self.repo.exists_by_email(&input.email).await? {
            return Err(AppError::Conflict(format!(
                "User with email '{}' already exists",
                input.email
            )));
        }
        if self.repo.exists_by_keycloak_id(&input.keycloak_id).await? {
            return Err(AppError::Conflict("Keycloak ID already exists".to_string()));
        }

        if let Some(address_id) = input.address_id {
            self.resolve_address(address_id).await?;
        }
        if let Some(gov_id) = input.gov_id {
            self.resolve_gov(gov_id).await?;
        }

        self.repo.insert(&input).await
    }

    /// Self-service update: only the Keycloak account that owns the record
    /// may change it, regardless of the caller's authorities.
    pub async fn update(
        &self,
        id: i64,
        principal: &Principal,
        input: UpdateUserInput,
    ) -> Result<User> {
        input.validate()?;
        let user = self.get(id).await?;

        if principal.subject != user.keycloak_id {
            return Err(AppError::Forbidden(
                "You can only update your own user".to_string(),
            ));
        }

        if let Some(ref email) = input.email {
            if email != &user.email && self.repo.exists_by_email(email).await? {
                return Err(AppError::Conflict(format!(
                    "User with email '{}' already exists",
                    email
                )));
            }
        }
        if let Some(ref keycloak_id) = input.keycloak_id {
            if keycloak_id != &user.keycloak_id {
                return Err(AppError::Conflict(
                    "Keycloak ID cannot be changed".to_string(),
                ));
            }
        }

        if let Some(address_id) = input.address_id {
            self.resolve_address(address_id).await?;
        }
        if let Some(gov_id) = input.gov_id {
            self.resolve_gov(gov_id).await?;
        }

        self.repo.update(id, &input).await
    }

    /// Remove the account externally, then soft delete locally.
    ///
    /// Ordering invariant: the Keycloak removal (including session
    /// invalidation) must succeed before the local row is touched. Any
    /// external failure aborts the operation with the local record intact.
    pub async fn delete_account(&self, id: i64) -> Result<()> {
        let user = self.get(id).await?;

        self.keycloak
            .logout_user(&user.keycloak_id)
            .await
            .map_err(|e| {
                AppError::ExternalSync(format!(
                    "Failed to invalidate Keycloak sessions for '{}': {}",
                    user.keycloak_id, e
                ))
            })?;
        self.keycloak
            .delete_user(&user.keycloak_id)
            .await
            .map_err(|e| {
                AppError::ExternalSync(format!(
                    "Failed to remove Keycloak account '{}': {}",
                    user.keycloak_id, e
                ))
            })?;

        self.repo.soft_delete(id).await
    }

    /// Ensure the user holds `role` in every recognized realm client.
    /// Callers need the admin authority.
    ///
    /// Each client scope is checked and granted independently: a scope where
    /// the role is already held is a no-op, and the operation is not atomic
    /// across scopes. Retrying after a partial failure is safe because each
    /// per-scope grant is idempotent.
    pub async fn ensure_role(&self, principal: &Principal, user_id: i64, role: &str) -> Result<()> {
        self.require_admin(principal)?;
        let user = self.get(user_id).await?;

        for client_id in RECOGNIZED_CLIENTS {
            let client_uuid = match self.keycloak.get_client_uuid_by_client_id(client_id).await {
                Ok(uuid) => uuid,
                Err(AppError::NotFound(_)) => {
                    return Err(AppError::InvalidConfiguration(format!(
                        "Keycloak client '{}' does not exist in realm '{}'",
                        client_id,
                        self.keycloak.realm()
                    )))
                }
                Err(e) => return Err(e),
            };

            let current = self
                .keycloak
                .list_client_role_mappings(&user.keycloak_id, &client_uuid)
                .await?;
            if current.iter().any(|r| r.name == role) {
                debug!(
                    "User {} already holds role '{}' in client '{}'",
                    user_id, role, client_id
                );
                continue;
            }

            let representation = match self.keycloak.get_client_role(&client_uuid, role).await {
                Ok(representation) => representation,
                Err(AppError::NotFound(_)) => {
                    return Err(AppError::RoleNotFound {
                        role: role.to_string(),
                        client: client_id.to_string(),
                    })
                }
                Err(e) => return Err(e),
            };

            self.keycloak
                .add_client_role_mappings(
                    &user.keycloak_id,
                    &client_uuid,
                    std::slice::from_ref(&representation),
                )
                .await?;
        }

        Ok(())
    }

    /// Privileged association path; not subject to the self-service rule but
    /// gated on the admin authority.
    pub async fn associate_gov(
        &self,
        principal: &Principal,
        gov_id: i64,
        user_id: i64,
    ) -> Result<User> {
        self.require_admin(principal)?;
        let gov = self.resolve_gov(gov_id).await?;
        let _ = self.get(user_id).await?;
        debug!("Associating user {} with gov '{}'", user_id, gov.name);
        self.repo.set_gov(user_id, gov.id).await
    }

    /// Rewrite stored object keys into time-limited retrieval URLs before a
    /// profile leaves the API.
    pub async fn with_presigned_urls(&self, mut user: User) -> Result<User> {
        if let Some(ref cv_url) = user.cv_url {
            user.cv_url = Some(self.storage.presigned_get_url(cv_url).await?);
        }
        if let Some(ref photo_url) = user.photo_url {
            user.photo_url = Some(self.storage.presigned_get_url(photo_url).await?);
        }
        Ok(user)
    }

    fn require_admin(&self, principal: &Principal) -> Result<()> {
        if !principal.has_authority(ADMIN_AUTHORITY) {
            return Err(AppError::Forbidden(format!(
                "Authority '{}' required",
                ADMIN_AUTHORITY
            )));
        }
        Ok(())
    }

    async fn resolve_address(&self, address_id: i64) -> Result<()> {
        self.address_repo
            .find_by_id(address_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Address {} not found", address_id)))?;
        Ok(())
    }

    async fn resolve_gov(&self, gov_id: i64) -> Result<Gov> {
        self.gov_repo
            .find_by_id(gov_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Gov {} not found", gov_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeycloakConfig;
    use crate::repository::{MockAddressRepository, MockGovRepository, MockUserRepository};
    use crate::storage::MockObjectStore;
    use serde_json::json;
    use std::collections::BTreeSet;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_user(id: i64) -> User {
        let now = chrono::Utc::now();
        User {
            id,
            keycloak_id: format!("kc-sub-{}", id),
            email: format!("user{}@example.com", id),
            name: Some("Test User".to_string()),
            address_id: None,
            gov_id: None,
            cv_url: None,
            photo_url: None,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn principal(subject: &str) -> Principal {
        Principal {
            subject: subject.to_string(),
            authorities: BTreeSet::new(),
        }
    }

    fn admin_principal() -> Principal {
        Principal {
            subject: "kc-sub-admin".to_string(),
            authorities: BTreeSet::from([ADMIN_AUTHORITY.to_string()]),
        }
    }

    fn keycloak_for(uri: &str) -> Arc<KeycloakClient> {
        Arc::new(KeycloakClient::new(KeycloakConfig {
            url: uri.to_string(),
            realm: "kafu".to_string(),
            admin_client_id: "admin-cli".to_string(),
            admin_client_secret: String::new(),
        }))
    }

    fn service(
        repo: MockUserRepository,
        keycloak: Arc<KeycloakClient>,
    ) -> UserService<MockUserRepository, MockAddressRepository, MockGovRepository> {
        service_with(
            repo,
            MockAddressRepository::new(),
            MockGovRepository::new(),
            keycloak,
            MockObjectStore::new(),
        )
    }

    fn service_with(
        repo: MockUserRepository,
        address_repo: MockAddressRepository,
        gov_repo: MockGovRepository,
        keycloak: Arc<KeycloakClient>,
        storage: MockObjectStore,
    ) -> UserService<MockUserRepository, MockAddressRepository, MockGovRepository> {
        UserService::new(
            Arc::new(repo),
            Arc::new(address_repo),
            Arc::new(gov_repo),
            keycloak,
            Arc::new(storage),
        )
    }

    async fn mock_admin_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/realms/master/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "mock-token",
                "expires_in": 300
            })))
            .mount(server)
            .await;
    }

    fn create_input() -> CreateUserInput {
        CreateUserInput {
            id: None,
            keycloak_id: "kc-sub-1".to_string(),
            email: "user1@example.com".to_string(),
            name: Some("Test User".to_string()),
            address_id: None,
            gov_id: None,
            cv_url: None,
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_preexisting_id() {
        let server = MockServer::start().await;
        let svc = service(MockUserRepository::new(), keycloak_for(&server.uri()));

        let input = CreateUserInput {
            id: Some(7),
            ..create_input()
        };
        let err = svc.create(input).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_keycloak_id() {
        let server = MockServer::start().await;
        let svc = service(MockUserRepository::new(), keycloak_for(&server.uri()));

        let input = CreateUserInput {
            keycloak_id: String::new(),
            ..create_input()
        };
        let err = svc.create(input).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_create_duplicate_email_conflicts() {
        let server = MockServer::start().await;
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_email().returning(|_| Ok(true));

        let svc = service(repo, keycloak_for(&server.uri()));
        let err = svc.create(create_input()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_duplicate_keycloak_id_conflicts() {
        let server = MockServer::start().await;
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_email().returning(|_| Ok(false));
        repo.expect_exists_by_keycloak_id().returning(|_| Ok(true));

        let svc = service(repo, keycloak_for(&server.uri()));
        let err = svc.create(create_input()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_resolves_associations() {
        let server = MockServer::start().await;
        let mut repo = MockUserRepository::new();
        repo.expect_exists_by_email().returning(|_| Ok(false));
        repo.expect_exists_by_keycloak_id().returning(|_| Ok(false));
        repo.expect_insert().returning(|_| Ok(test_user(1)));

        let mut address_repo = MockAddressRepository::new();
        address_repo.expect_find_by_id().returning(|_| Ok(None));

        let svc = service_with(
            repo,
            address_repo,
            MockGovRepository::new(),
            keycloak_for(&server.uri()),
            MockObjectStore::new(),
        );

        let input = CreateUserInput {
            address_id: Some(42),
            ..create_input()
        };
        let err = svc.create(input).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_foreign_subject() {
        let server = MockServer::start().await;
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(Some(test_user(1))));
        repo.expect_update().times(0);

        let svc = service(repo, keycloak_for(&server.uri()));
        let err = svc
            .update(1, &principal("kc-sub-2"), UpdateUserInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_keycloak_id_change() {
        let server = MockServer::start().await;
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(Some(test_user(1))));

        let svc = service(repo, keycloak_for(&server.uri()));
        let input = UpdateUserInput {
            keycloak_id: Some("kc-sub-other".to_string()),
            ..UpdateUserInput::default()
        };
        let err = svc.update(1, &principal("kc-sub-1"), input).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_email_collision() {
        let server = MockServer::start().await;
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(Some(test_user(1))));
        repo.expect_exists_by_email().returning(|_| Ok(true));

        let svc = service(repo, keycloak_for(&server.uri()));
        let input = UpdateUserInput {
            email: Some("taken@example.com".to_string()),
            ..UpdateUserInput::default()
        };
        let err = svc.update(1, &principal("kc-sub-1"), input).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_by_owner_succeeds() {
        let server = MockServer::start().await;
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(Some(test_user(1))));
        repo.expect_update().times(1).returning(|_, _| {
            Ok(User {
                name: Some("Renamed".to_string()),
                ..test_user(1)
            })
        });

        let svc = service(repo, keycloak_for(&server.uri()));
        let input = UpdateUserInput {
            name: Some("Renamed".to_string()),
            ..UpdateUserInput::default()
        };
        let user = svc.update(1, &principal("kc-sub-1"), input).await.unwrap();
        assert_eq!(user.name.as_deref(), Some("Renamed"));
    }

    #[tokio::test]
    async fn test_delete_account_external_failure_leaves_local_untouched() {
        let server = MockServer::start().await;
        mock_admin_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/admin/realms/kafu/users/kc-sub-1/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(Some(test_user(1))));
        repo.expect_soft_delete().times(0);

        let svc = service(repo, keycloak_for(&server.uri()));
        let err = svc.delete_account(1).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalSync(_)));
    }

    #[tokio::test]
    async fn test_delete_account_external_first_then_soft_delete() {
        let server = MockServer::start().await;
        mock_admin_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/admin/realms/kafu/users/kc-sub-1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/admin/realms/kafu/users/kc-sub-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(Some(test_user(1))));
        repo.expect_soft_delete().times(1).returning(|_| Ok(()));

        let svc = service(repo, keycloak_for(&server.uri()));
        svc.delete_account(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_account_missing_keycloak_account_is_fatal() {
        let server = MockServer::start().await;
        mock_admin_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/admin/realms/kafu/users/kc-sub-1/logout"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(Some(test_user(1))));
        repo.expect_soft_delete().times(0);

        let svc = service(repo, keycloak_for(&server.uri()));
        let err = svc.delete_account(1).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalSync(_)));
    }

    fn role_json(id: &str, name: &str) -> serde_json::Value {
        json!({"id": id, "name": name, "clientRole": true})
    }

    async fn mock_client_lookup(server: &MockServer, client_id: &str, uuid: &str) {
        Mock::given(method("GET"))
            .and(path("/admin/realms/kafu/clients"))
            .and(query_param("clientId", client_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": uuid, "clientId": client_id, "enabled": true}
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_ensure_role_grants_only_missing_scope() {
        let server = MockServer::start().await;
        mock_admin_token(&server).await;
        mock_client_lookup(&server, "kafu-api", "api-uuid").await;
        mock_client_lookup(&server, "kafu-web", "web-uuid").await;

        // Already held in kafu-api, missing in kafu-web
        Mock::given(method("GET"))
            .and(path("/admin/realms/kafu/users/kc-sub-1/role-mappings/clients/api-uuid"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([role_json("r1", "gov")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/kafu/users/kc-sub-1/role-mappings/clients/web-uuid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/kafu/clients/web-uuid/roles/gov"))
            .respond_with(ResponseTemplate::new(200).set_body_json(role_json("r2", "gov")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/realms/kafu/users/kc-sub-1/role-mappings/clients/web-uuid"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(Some(test_user(1))));

        let svc = service(repo, keycloak_for(&server.uri()));
        svc.ensure_role(&admin_principal(), 1, "gov").await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_role_is_noop_when_held_everywhere() {
        let server = MockServer::start().await;
        mock_admin_token(&server).await;
        mock_client_lookup(&server, "kafu-api", "api-uuid").await;
        mock_client_lookup(&server, "kafu-web", "web-uuid").await;

        for uuid in ["api-uuid", "web-uuid"] {
            Mock::given(method("GET"))
                .and(path(format!(
                    "/admin/realms/kafu/users/kc-sub-1/role-mappings/clients/{uuid}"
                )))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!([role_json("r1", "gov")])),
                )
                .mount(&server)
                .await;
        }

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(Some(test_user(1))));

        let svc = service(repo, keycloak_for(&server.uri()));
        // No POST mocks mounted: any grant attempt would fail the call
        svc.ensure_role(&admin_principal(), 1, "gov").await.unwrap();
        svc.ensure_role(&admin_principal(), 1, "gov").await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_role_unregistered_client_is_configuration_error() {
        let server = MockServer::start().await;
        mock_admin_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/kafu/clients"))
            .and(query_param("clientId", "kafu-api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(Some(test_user(1))));

        let svc = service(repo, keycloak_for(&server.uri()));
        let err = svc.ensure_role(&admin_principal(), 1, "gov").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn test_ensure_role_missing_role_names_offending_client() {
        let server = MockServer::start().await;
        mock_admin_token(&server).await;
        mock_client_lookup(&server, "kafu-api", "api-uuid").await;
        mock_client_lookup(&server, "kafu-web", "web-uuid").await;

        for uuid in ["api-uuid", "web-uuid"] {
            Mock::given(method("GET"))
                .and(path(format!(
                    "/admin/realms/kafu/users/kc-sub-1/role-mappings/clients/{uuid}"
                )))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
                .mount(&server)
                .await;
        }
        // Role exists in kafu-api, missing from kafu-web's catalog
        Mock::given(method("GET"))
            .and(path("/admin/realms/kafu/clients/api-uuid/roles/gov"))
            .respond_with(ResponseTemplate::new(200).set_body_json(role_json("r1", "gov")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/realms/kafu/users/kc-sub-1/role-mappings/clients/api-uuid"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/realms/kafu/clients/web-uuid/roles/gov"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(Some(test_user(1))));

        let svc = service(repo, keycloak_for(&server.uri()));
        let err = svc.ensure_role(&admin_principal(), 1, "gov").await.unwrap_err();
        match err {
            AppError::RoleNotFound { role, client } => {
                assert_eq!(role, "gov");
                assert_eq!(client, "kafu-web");
            }
            other => panic!("expected RoleNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ensure_role_requires_admin_authority() {
        let server = MockServer::start().await;
        let svc = service(MockUserRepository::new(), keycloak_for(&server.uri()));
        let err = svc
            .ensure_role(&principal("kc-sub-1"), 1, "gov")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_associate_gov_requires_admin_authority() {
        let server = MockServer::start().await;
        let svc = service(MockUserRepository::new(), keycloak_for(&server.uri()));
        let err = svc
            .associate_gov(&principal("kc-sub-1"), 5, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_associate_gov_links_user() {
        let server = MockServer::start().await;
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(Some(test_user(1))));
        repo.expect_set_gov().times(1).returning(|_, gov_id| {
            Ok(User {
                gov_id: Some(gov_id),
                ..test_user(1)
            })
        });

        let mut gov_repo = MockGovRepository::new();
        gov_repo.expect_find_by_id().returning(|id| {
            Ok(Some(crate::domain::Gov {
                id,
                name: "Test Gov".to_string(),
                email: None,
                created_at: chrono::Utc::now(),
            }))
        });

        let svc = service_with(
            repo,
            MockAddressRepository::new(),
            gov_repo,
            keycloak_for(&server.uri()),
            MockObjectStore::new(),
        );

        let user = svc.associate_gov(&admin_principal(), 5, 1).await.unwrap();
        assert_eq!(user.gov_id, Some(5));
    }

    #[tokio::test]
    async fn test_resolve_current_user_without_principal() {
        let server = MockServer::start().await;
        let svc = service(MockUserRepository::new(), keycloak_for(&server.uri()));
        let err = svc.resolve_current_user(None).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_resolve_current_user_unbound_subject() {
        let server = MockServer::start().await;
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_keycloak_id().returning(|_| Ok(None));

        let svc = service(repo, keycloak_for(&server.uri()));
        let err = svc
            .resolve_current_user(Some(&principal("kc-sub-unknown")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_with_presigned_urls_rewrites_stored_keys() {
        let server = MockServer::start().await;
        let mut storage = MockObjectStore::new();
        storage
            .expect_presigned_get_url()
            .returning(|key| Ok(format!("https://cdn.example/{key}?sig=abc")));

        let svc = service_with(
            MockUserRepository::new(),
            MockAddressRepository::new(),
            MockGovRepository::new(),
            keycloak_for(&server.uri()),
            storage,
        );

        let user = User {
            cv_url: Some("cv/1.pdf".to_string()),
            photo_url: None,
            ..test_user(1)
        };
        let user = svc.with_presigned_urls(user).await.unwrap();
        assert_eq!(
            user.cv_url.as_deref(),
            Some("https://cdn.example/cv/1.pdf?sig=abc")
        );
        assert!(user.photo_url.is_none());
    }
}
