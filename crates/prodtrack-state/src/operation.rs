//! Ledger contract functions and who may call them.

use prodtrack_core::Organization;

/// A contract function, named as the ledger knows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateProduct,
    UpdateProduct,
    ProductOrder,
    ProductAccept,
    ProductShip,
    ProductDeliver,
    ReadProduct,
    TrackProductHistory,
    GetAllProducts,
    GetProductsByManufacturer,
    GetConsumerOrderedProductList,
    GetOrderRequestedProductList,
    GetProductStatus,
    VerifyProductAuthenticity,
}

impl Operation {
    /// Every contract function.
    pub const ALL: [Operation; 14] = [
        Self::CreateProduct,
        Self::UpdateProduct,
        Self::ProductOrder,
        Self::ProductAccept,
        Self::ProductShip,
        Self::ProductDeliver,
        Self::ReadProduct,
        Self::TrackProductHistory,
        Self::GetAllProducts,
        Self::GetProductsByManufacturer,
        Self::GetConsumerOrderedProductList,
        Self::GetOrderRequestedProductList,
        Self::GetProductStatus,
        Self::VerifyProductAuthenticity,
    ];

    /// Function name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateProduct => "CreateProduct",
            Self::UpdateProduct => "UpdateProduct",
            Self::ProductOrder => "ProductOrder",
            Self::ProductAccept => "ProductAccept",
            Self::ProductShip => "ProductShip",
            Self::ProductDeliver => "ProductDeliver",
            Self::ReadProduct => "ReadProduct",
            Self::TrackProductHistory => "TrackProductHistory",
            Self::GetAllProducts => "GetAllProducts",
            Self::GetProductsByManufacturer => "GetProductsByManufacturer",
            Self::GetConsumerOrderedProductList => "GetConsumerOrderedProductList",
            Self::GetOrderRequestedProductList => "GetOrderRequestedProductList",
            Self::GetProductStatus => "GetProductStatus",
            Self::VerifyProductAuthenticity => "VerifyProductAuthenticity",
        }
    }

    /// Look up a function by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Whether the function changes state (and must be submitted rather
    /// than evaluated).
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateProduct
                | Self::UpdateProduct
                | Self::ProductOrder
                | Self::ProductAccept
                | Self::ProductShip
                | Self::ProductDeliver
        )
    }

    /// The only organization allowed to invoke a mutation. Queries are open
    /// to every member.
    pub fn required_org(&self) -> Option<Organization> {
        match self {
            Self::CreateProduct | Self::UpdateProduct | Self::ProductAccept | Self::ProductShip => {
                Some(Organization::Org1)
            }
            Self::ProductOrder | Self::ProductDeliver => Some(Organization::Org2),
            _ => None,
        }
    }

    /// Number of positional arguments the function takes.
    pub fn arity(&self) -> usize {
        match self {
            Self::CreateProduct | Self::UpdateProduct => 6,
            Self::ProductOrder | Self::ProductAccept | Self::ProductDeliver => 3,
            Self::ProductShip => 2,
            Self::GetAllProducts => 0,
            Self::ReadProduct
            | Self::TrackProductHistory
            | Self::GetProductsByManufacturer
            | Self::GetConsumerOrderedProductList
            | Self::GetOrderRequestedProductList
            | Self::GetProductStatus
            | Self::VerifyProductAuthenticity => 1,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
