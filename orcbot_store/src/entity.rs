pub mod threads {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "orcbot_threads")]
    pub struct Model {
        /// Timestamp of the first message in the thread.
        #[sea_orm(primary_key, auto_increment = false)]
        pub timestamp: String,
        pub session_id: String,
        pub updated_at: DateTime,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
