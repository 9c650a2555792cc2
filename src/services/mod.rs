//! Business logic services

pub mod catalog;
pub mod loans;
pub mod redis;
pub mod relations;
pub mod reviews;
pub mod users;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub reviews: reviews::ReviewsService,
    pub relations: relations::RelationsService,
    pub users: users::UsersService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig, redis_service: redis::RedisService) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), config.media.url_prefix.clone()),
            loans: loans::LoansService::new(repository.clone()),
            reviews: reviews::ReviewsService::new(repository.clone()),
            relations: relations::RelationsService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), config.auth.clone(), redis_service),
            repository,
        }
    }
}
