use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, Clock, SessionManager, TokenEngine};
use crate::configuration::AuthSettings;
use crate::middleware::{CheckUser, RequireAuth};
use crate::routes::{
    get_current_account, health_check, login, logout, refresh, session_status, signup,
};
use crate::store::{AccountStore, SessionStore};

/// Services shared by every request handler
///
/// Built once at startup; handlers receive them through `web::Data`.
#[derive(Clone)]
pub struct Services {
    pub sessions: Arc<SessionManager>,
    pub auth: Arc<AuthService>,
}

impl Services {
    pub fn new(
        settings: AuthSettings,
        clock: Arc<dyn Clock>,
        session_store: Arc<dyn SessionStore>,
        account_store: Arc<dyn AccountStore>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            TokenEngine::new(clock),
            settings,
            session_store,
            account_store.clone(),
        ));
        let auth = Arc::new(AuthService::new(sessions.clone(), account_store));

        Self { sessions, auth }
    }
}

pub fn run(listener: TcpListener, services: Services) -> Result<Server, std::io::Error> {
    let sessions = services.sessions.clone();
    let sessions_data = web::Data::from(services.sessions);
    let auth_data = web::Data::from(services.auth);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())

            // Shared state
            .app_data(sessions_data.clone())
            .app_data(auth_data.clone())

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/signup", web::post().to(signup))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/logout", web::post().to(logout))
                    .service(
                        web::resource("/status")
                            .wrap(CheckUser::new(sessions.clone()))
                            .route(web::get().to(session_status)),
                    ),
            )

            // Protected routes (require a valid access token or a renewable session)
            .service(
                web::scope("/api")
                    .wrap(RequireAuth::new(sessions.clone()))
                    .route("/me", web::get().to(get_current_account)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
