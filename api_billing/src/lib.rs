use actix_web::web;

pub mod routes {
    pub mod billing;
    pub mod pricing;
    pub mod usage;

    #[cfg(test)]
    pub(crate) mod testing;
}

pub mod services {
    pub mod billing;
    pub mod pricing;
    pub mod provider;
    pub mod stripe_billing;
    pub mod usage;
}

pub mod dtos {
    pub mod billing;
    pub mod usage;
}

pub mod models {
    pub mod billing;
}

pub use services::{provider::BillingProvider, stripe_billing::StripeBilling};

pub fn mount_billing() -> actix_web::Scope {
    web::scope("/billing")
        .service(routes::billing::get_billing)
        .service(routes::billing::get_usage)
        .service(routes::billing::post_checkout)
        .service(routes::billing::post_cancel)
}

pub fn mount_usage_events() -> actix_web::Scope {
    web::scope("/usage-events").service(routes::usage::post_usage_event)
}

pub fn mount_pricing() -> actix_web::Scope {
    web::scope("/pricing").service(routes::pricing::get_pricing)
}
