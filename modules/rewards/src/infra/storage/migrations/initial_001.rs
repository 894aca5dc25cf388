use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserProgress::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserProgress::UserId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserProgress::TotalPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserProgress::CurrentLevel)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(UserProgress::CycleProgress)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(UserProgress::WheelSpunThisCycle)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(UserProgress::FirstPickupCouponUsed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(UserProgress::SubmissionCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserProgress::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserProgress::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProgressTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProgressTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProgressTransactions::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ProgressTransactions::PickupId)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ProgressTransactions::PointsAwarded)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProgressTransactions::Category)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProgressTransactions::WeightKg)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProgressTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_progress_transactions_user")
                            .from(ProgressTransactions::Table, ProgressTransactions::UserId)
                            .to(UserProgress::Table, UserProgress::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_progress_transactions_user")
                    .table(ProgressTransactions::Table)
                    .col(ProgressTransactions::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rewards::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rewards::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Rewards::UserId).uuid().not_null())
                    .col(ColumnDef::new(Rewards::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(Rewards::Title).string().not_null())
                    .col(ColumnDef::new(Rewards::Description).string().not_null())
                    .col(
                        ColumnDef::new(Rewards::CouponCode)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Rewards::Discount).string().not_null())
                    .col(ColumnDef::new(Rewards::Partner).string().not_null())
                    .col(ColumnDef::new(Rewards::Level).integer().null())
                    .col(ColumnDef::new(Rewards::PrizeType).string_len(32).null())
                    .col(ColumnDef::new(Rewards::PrizeValue).big_integer().null())
                    .col(
                        ColumnDef::new(Rewards::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Rewards::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rewards_user")
                            .from(Rewards::Table, Rewards::UserId)
                            .to(UserProgress::Table, UserProgress::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rewards_user_created")
                    .table(Rewards::Table)
                    .col(Rewards::UserId)
                    .col(Rewards::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RewardRedemptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RewardRedemptions::RewardId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RewardRedemptions::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(RewardRedemptions::RedeemedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reward_redemptions_reward")
                            .from(RewardRedemptions::Table, RewardRedemptions::RewardId)
                            .to(Rewards::Table, Rewards::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RewardRedemptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rewards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProgressTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserProgress::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum UserProgress {
    Table,
    UserId,
    TotalPoints,
    CurrentLevel,
    CycleProgress,
    WheelSpunThisCycle,
    FirstPickupCouponUsed,
    SubmissionCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ProgressTransactions {
    Table,
    Id,
    UserId,
    PickupId,
    PointsAwarded,
    Category,
    WeightKg,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Rewards {
    Table,
    Id,
    UserId,
    Kind,
    Title,
    Description,
    CouponCode,
    Discount,
    Partner,
    Level,
    PrizeType,
    PrizeValue,
    CreatedAt,
    ExpiresAt,
}

#[derive(DeriveIden)]
enum RewardRedemptions {
    Table,
    RewardId,
    UserId,
    RedeemedAt,
}
