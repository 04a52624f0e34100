/// Header carrying the bearer token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Default content type for requests without a multipart body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Backend endpoints used by the admin client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// List a salon's services
    SalonServices { salon_id: &'a str },
    /// Set the salon's main picture URL
    MainPicture,
    /// Create a service in the logged-in salon's catalog
    CreateService,
    /// Fetch the logged-in salon's profile
    Profile,
    Register,
    Login,
    Logout,
}

impl Endpoint<'_> {
    /// Constructs the URL path for this endpoint, relative to the API base
    fn to_path(self) -> String {
        match self {
            Self::SalonServices { salon_id } => {
                format!("/salons/{}/services", urlencoding::encode(salon_id))
            }
            Self::MainPicture => "/salons/profile/main-picture".to_string(),
            Self::CreateService => "/salons/services".to_string(),
            Self::Profile => "/salons/profile".to_string(),
            Self::Register => "/auth/salon/register".to_string(),
            Self::Login => "/auth/salon/login".to_string(),
            Self::Logout => "/auth/salon/logout".to_string(),
        }
    }

    /// Whether the endpoint expects a bearer token
    #[must_use]
    pub const fn requires_auth(self) -> bool {
        !matches!(self, Self::Register | Self::Login)
    }
}

/// Joins `base_url` (e.g. `http://host:7700/api`) and the endpoint path.
#[must_use]
pub fn construct_endpoint_url(base_url: &str, endpoint: Endpoint) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), endpoint.to_path())
}
