use crate::{
    api::{attendance, dashboard, reports, students, sync},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{
    middleware::{Condition, from_fn},
    web,
};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter; 0 requests per minute turns it off
    fn build_limiter(
        requests_per_min: u32,
    ) -> Condition<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
        let burst = requests_per_min.max(1);
        let per_ms = (60_000 / burst as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .milliseconds_per_request(per_ms)
            .burst_size(burst)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("rate limiter config with non-zero period and burst");
        Condition::new(requests_per_min > 0, Governor::new(&cfg))
    }

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/signup")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::signup)),
            )
            .service(
                web::resource("/logout")
                    .wrap(from_fn(auth_middleware))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(build_limiter(config.rate_protected_per_min)) // rate limiting
            .service(handlers::me)
            .service(web::resource("/sync").route(web::post().to(sync::sync)))
            .service(
                web::scope("/students")
                    // /students
                    .service(
                        web::resource("")
                            .route(web::get().to(students::list_students))
                            .route(web::post().to(students::create_student)),
                    )
                    // /students/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(students::update_student))
                            .route(web::delete().to(students::delete_student)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::get().to(attendance::sheet))
                            .route(web::post().to(attendance::mark)),
                    )
                    // registered before /{id} so "bulk" is not taken for an id
                    .service(web::resource("/bulk").route(web::post().to(attendance::bulk_mark)))
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}").route(web::patch().to(attendance::annotate)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .service(web::resource("/{kind}").route(web::get().to(reports::report)))
                    .service(
                        web::resource("/{kind}/csv")
                            .route(web::get().to(reports::report_csv_download)),
                    ),
            )
            .service(web::resource("/dashboard").route(web::get().to(dashboard::show_dashboard)))
            .service(web::resource("/departments").route(web::get().to(dashboard::departments))),
    );
}

// LOGIN
//  ├─ backend sign-in with <username>@<EMAIL_DOMAIN>
//  └─ session token (ACCESS_TOKEN_TTL), backend token kept server-side

// API REQUEST
//  └─ Authorization: Bearer session token
