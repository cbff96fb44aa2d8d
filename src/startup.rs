use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;

use crate::configuration::JwtSettings;
use crate::logger::RequestLogger;
use crate::middleware::JwtMiddleware;
use crate::routes::{get_current_user, health_check, login, refresh, register, revoke};

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    jwt_config: JwtSettings,
) -> Result<Server, std::io::Error> {
    let connection = web::Data::new(connection);
    let jwt_config_data = web::Data::new(jwt_config.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(RequestLogger)
            .app_data(connection.clone())
            .app_data(jwt_config_data.clone())
            .route("/health_check", web::get().to(health_check))
            // Public auth endpoints
            .service(
                web::scope("/api/v2/UsersAuth")
                    .route("/login", web::post().to(login))
                    .route("/register", web::post().to(register))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke)),
            )
            // Bearer-protected endpoints
            .service(
                web::scope("/api/v2/users")
                    .wrap(JwtMiddleware::new(jwt_config.clone()))
                    .route("/me", web::get().to(get_current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
