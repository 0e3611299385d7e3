//! EntryPoint v0.6 contract bindings

use alloy::sol;

sol! {
    /// UserOperation struct as passed to the v0.6 entry point
    #[derive(Debug, Default, PartialEq, Eq)]
    struct UserOp {
        address sender;
        uint256 nonce;
        bytes initCode;
        bytes callData;
        uint256 callGasLimit;
        uint256 verificationGasLimit;
        uint256 preVerificationGas;
        uint256 maxFeePerGas;
        uint256 maxPriorityFeePerGas;
        bytes paymasterAndData;
        bytes signature;
    }

    /// EntryPoint interface (read-only subset)
    #[sol(rpc)]
    interface IEntryPoint {
        /// Next nonce of `sender` for the given 192-bit key
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);

        /// Hash the account signs: binds the operation, entry point and chain id
        function getUserOpHash(UserOp calldata userOp) external view returns (bytes32);
    }
}
