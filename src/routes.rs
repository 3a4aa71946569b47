use crate::{
    api::{attendance, client, employee, employee_image, filial, position, user, working_graphic},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-client rate limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    login: Limiter,
    register: Limiter,
    refresh: Limiter,
    protected: Limiter,
    device: Limiter,
}

impl Limiters {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            login: build_limiter("login", config.rate_login_per_min)?,
            register: build_limiter("register", config.rate_register_per_min)?,
            refresh: build_limiter("refresh", config.rate_refresh_per_min)?,
            protected: build_limiter("protected", config.rate_protected_per_min)?,
            device: build_limiter("device", config.rate_device_per_min)?,
        })
    }
}

/// Limiter replenishing `requests_per_min` tokens a minute, with a burst of
/// the same size. Zero is treated as one.
fn build_limiter(name: &str, requests_per_min: u32) -> Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid {name} rate limit"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(limiters.register.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    let protected = || limiters.protected.clone();

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .service(
                web::scope("/auth")
                    .wrap(protected())
                    .route("/me", web::get().to(handlers::me)),
            )
            .service(
                web::scope("/me")
                    .wrap(protected())
                    .route("/attendance/{month}", web::get().to(attendance::my_attendance)),
            )
            .service(
                web::scope("/users")
                    .wrap(protected())
                    .service(
                        web::resource("")
                            .route(web::post().to(user::create_user))
                            .route(web::get().to(user::list_users)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(user::get_user))
                            .route(web::put().to(user::update_user))
                            .route(web::delete().to(user::delete_user)),
                    ),
            )
            .service(
                web::scope("/positions")
                    .wrap(protected())
                    .service(
                        web::resource("")
                            .route(web::post().to(position::create_position))
                            .route(web::get().to(position::list_positions)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(position::get_position))
                            .route(web::put().to(position::update_position))
                            .route(web::delete().to(position::delete_position)),
                    ),
            )
            .service(
                web::scope("/filials")
                    .wrap(protected())
                    .service(
                        web::resource("")
                            .route(web::post().to(filial::create_filial))
                            .route(web::get().to(filial::list_filials)),
                    )
                    // before /{id}
                    .route("/commers/{date}", web::get().to(filial::all_day_commers))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(filial::get_filial))
                            .route(web::put().to(filial::update_filial))
                            .route(web::delete().to(filial::delete_filial)),
                    )
                    .route(
                        "/{id}/attendance/{date}",
                        web::get().to(filial::filial_attendance),
                    )
                    .route(
                        "/{id}/commers/monthly/{month}",
                        web::get().to(filial::filial_month_commers),
                    )
                    .route("/{id}/commers/{date}", web::get().to(filial::filial_day_commers)),
            )
            .service(
                web::scope("/working-graphics")
                    .wrap(protected())
                    .service(
                        web::resource("")
                            .route(web::post().to(working_graphic::create_working_graphic))
                            .route(web::get().to(working_graphic::list_working_graphics)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(working_graphic::get_working_graphic))
                            .route(web::put().to(working_graphic::update_working_graphic))
                            .route(web::delete().to(working_graphic::delete_working_graphic)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .wrap(protected())
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // before /{id}
                    .route("/images", web::get().to(employee_image::list_all_images))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .service(
                        web::resource("/{id}/images")
                            .route(web::post().to(employee_image::upload_image))
                            .route(web::get().to(employee_image::list_employee_images)),
                    )
                    .service(
                        web::resource("/{id}/images/{image_id}")
                            .route(web::get().to(employee_image::get_image))
                            .route(web::put().to(employee_image::replace_image))
                            .route(web::delete().to(employee_image::delete_image)),
                    )
                    .route(
                        "/{id}/attendance/{month}",
                        web::get().to(employee::employee_attendance),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // device ingestion
                    .service(
                        web::resource("")
                            .wrap(limiters.device.clone())
                            .route(web::post().to(attendance::create_attendance))
                            .route(web::get().to(attendance::list_attendance)),
                    )
                    .service(
                        web::resource("/{id}")
                            .wrap(protected())
                            .route(web::get().to(attendance::get_attendance))
                            .route(web::delete().to(attendance::delete_attendance)),
                    ),
            )
            .service(
                web::scope("/clients")
                    // device ingestion
                    .service(
                        web::resource("")
                            .wrap(limiters.device.clone())
                            .route(web::post().to(client::create_client))
                            .route(web::get().to(client::list_clients)),
                    )
                    // before /reports/{date} and /{id}
                    .service(
                        web::resource("/reports/rebuild")
                            .wrap(protected())
                            .route(web::post().to(client::rebuild_daily_reports)),
                    )
                    .service(
                        web::resource("/reports")
                            .wrap(protected())
                            .route(web::get().to(client::list_daily_reports)),
                    )
                    .service(
                        web::resource("/reports/{date}")
                            .wrap(protected())
                            .route(web::get().to(client::get_daily_report)),
                    )
                    .service(
                        web::resource("/{id}")
                            .wrap(protected())
                            .route(web::get().to(client::get_client)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token
