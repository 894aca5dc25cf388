use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rewards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    /// `level_up`, `first_submission` or `spin_prize`
    pub kind: String,
    pub title: String,
    pub description: String,
    #[sea_orm(unique)]
    pub coupon_code: String,
    pub discount: String,
    pub partner: String,
    pub level: Option<i32>,
    pub prize_type: Option<String>,
    pub prize_value: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::reward_redemption::Entity")]
    Redemption,
}

impl Related<super::reward_redemption::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Redemption.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
