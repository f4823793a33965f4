//! Contract interfaces consumed by the SDK.
//!
//! The exchange and factory declarations mirror the deployed contracts,
//! including their custom errors so reverts can be decoded into
//! [`crate::error::RevertReason`].

#[allow(clippy::too_many_arguments)]
pub mod exchange {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        contract TokenExchange {
            event TokenBought(
                address indexed buyer,
                address indexed token,
                uint256 amountSpent,
                uint256 tokensBought
            );
            event TokenSold(
                address indexed seller,
                address indexed token,
                uint256 tokensSold,
                uint256 amountReceived
            );

            error PRBMath_MulDiv18_Overflow(uint256 x, uint256 y);
            error PRBMath_MulDiv_Overflow(uint256 x, uint256 y, uint256 denominator);
            error Reentrancy();

            function buyToken(address token, uint256 reserveAmount) external;
            function sellToken(address token, uint256 tokenAmount) external;
            function calculateExchangeAmount(address token, uint256 amount, bool isBuying)
                external
                view
                returns (uint256);
            function tokenFactory() external view returns (address);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod factory {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        contract TokenFactory {
            struct TokenConfig {
                address tokenAddress;
                address reserveToken;
                uint256 slope;
                uint256 reserveWeight;
            }

            event Initialized(uint64 version);
            event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);
            event TokenCreated(address indexed tokenAddress, address indexed creator);

            error InvalidInitialization();
            error NotInitializing();
            error OwnableInvalidOwner(address owner);
            error OwnableUnauthorizedAccount(address account);
            error ReentrancyGuardReentrantCall();

            function createToken(
                string name,
                string symbol,
                uint256 initialSupply,
                uint256 reserveWeight,
                uint256 slope,
                address creator,
                address reserveTokenAddress,
                address _exchangeAddress
            ) external returns (address tokenAddress);
            function getTokenConfig(address tokenAddress)
                external
                view
                returns (TokenConfig memory, uint256);
            function tokenConfigs(address token)
                external
                view
                returns (address tokenAddress, address reserveToken, uint256 slope, uint256 reserveWeight);
            function listAllTokens() external view returns (address[] memory);
            function tokensCreatedBy(address creator) external view returns (address[] memory);
            function isTokenFromFactory(address tokenAddress) external view returns (bool);
            function totalCreatedTokens() external view returns (uint256);
            function getTokensBatch(uint256 from, uint256 to) external view returns (address[] memory);
            function defaultReserveToken() external view returns (address);
            function exchangeAddress() external view returns (address);
            function initialize(address _defaultReserveToken) external;
            function owner() external view returns (address);
            function transferOwnership(address newOwner) external;
            function renounceOwnership() external;
        }
    );
}

pub mod erc20 {
    alloy::sol!(
        /// Fungible token interface shared by the reserve asset and created tokens.
        #[derive(Debug)]
        #[sol(rpc)]
        interface IERC20 {
            event Transfer(address indexed from, address indexed to, uint256 value);
            event Approval(address indexed owner, address indexed spender, uint256 value);

            function name() external view returns (string);
            function symbol() external view returns (string);
            function decimals() external view returns (uint8);
            function totalSupply() external view returns (uint256);
            function balanceOf(address owner) external view returns (uint256);
            function allowance(address owner, address spender) external view returns (uint256);
            function approve(address spender, uint256 amount) external returns (bool);
            function transfer(address to, uint256 amount) external returns (bool);
            function transferFrom(address from, address to, uint256 amount) external returns (bool);
        }
    );

    alloy::sol!(
        /// Reserve asset extension accepting deposits of backing collateral.
        #[derive(Debug)]
        #[sol(rpc)]
        interface IReserveToken {
            function depositReserveToken(uint256 amount) external;
        }
    );
}
