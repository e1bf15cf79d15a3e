//! Ingress Gateway

pub(crate) mod middleware;
