//! Membership service

use validator::Validate;

use crate::{
    error::AppResult,
    models::member::{CreateMember, Member, UpdateMember},
    repository::Repository,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
}

impl MembersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Member>> {
        self.repository.members.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        self.repository.members.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateMember) -> AppResult<Member> {
        data.validate()?;
        self.repository.members.create(data).await
    }

    pub async fn update(&self, id: i32, data: &UpdateMember) -> AppResult<Member> {
        data.validate()?;
        self.repository.members.update(id, data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.members.delete(id).await
    }
}
