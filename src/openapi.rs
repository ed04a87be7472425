//! OpenAPI document served at `/openapi.json`.

use crate::config::Settings;
use crate::error::FieldError;
use crate::handlers::common::HealthCheck;
use crate::model::{CreateExampleBody, ExampleResponse, ExampleStatus, HealthCheckStatus, SortOrder};
use crate::response::{Message, ProblemDetails};
use utoipa::openapi::info::ContactBuilder;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct ApiKeyAddon;

impl Modify for ApiKeyAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "ApiKey",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&ApiKeyAddon),
    paths(
        crate::handlers::common::healthcheck,
        crate::handlers::example::list,
        crate::handlers::example::read,
        crate::handlers::example::create,
        crate::handlers::example::delete,
    ),
    components(schemas(
        ProblemDetails,
        FieldError,
        Message,
        HealthCheck,
        HealthCheckStatus,
        SortOrder,
        ExampleStatus,
        ExampleResponse,
        CreateExampleBody,
    )),
    tags(
        (name = "Common", description = "Health and service information"),
        (name = "Example", description = "Example entity CRUD")
    )
)]
pub struct ApiDoc;

/// The document with title, version, description and contact taken from settings.
pub fn openapi(settings: &Settings) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let app = &settings.app;
    doc.info.title = app.name.clone();
    doc.info.version = app.version.clone();
    doc.info.description = Some(app.description.clone());
    if !app.contact.is_empty() {
        let get = |key: &str| {
            app.contact
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.clone())
        };
        doc.info.contact = Some(
            ContactBuilder::new()
                .name(get("name"))
                .email(get("email"))
                .url(get("url"))
                .build(),
        );
    }
    doc
}
