//! SimpleAccount and SimpleAccountFactory bindings

use alloy::sol;

sol! {
    /// Counterfactual account factory
    #[sol(rpc)]
    interface ISimpleAccountFactory {
        /// Deploy (or return) the account of `owner` for `salt`
        function createAccount(address owner, uint256 salt) external returns (address ret);

        /// CREATE2 address of the account of `owner` for `salt`
        function getAddress(address owner, uint256 salt) external view returns (address);
    }

    /// Smart account call surface
    #[sol(rpc)]
    interface ISimpleAccount {
        /// Execute a single call
        function execute(address dest, uint256 value, bytes calldata func) external;

        /// Execute value-less calls in order
        function executeBatch(address[] calldata dest, bytes[] calldata func) external;
    }
}
