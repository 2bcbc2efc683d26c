//! Call interfaces of the marketplace contracts.
//!
//! Generated call structs encode arguments with `abi_encode()` and decode
//! results with `abi_decode_returns(..)`; the `*Calls` enums decode calldata.

use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface ICourseManager {
        function createCourse(string name, string description, uint256 priceWei, string category, string contentUri) external returns (uint256);
        function purchaseCourse(uint256 courseId) external payable;
        function nextCourseId() external view returns (uint256);
        function courses(uint256) external view returns (uint256 id, address creator, string name, string description, uint256 priceWei, string category, string contentUri);
        function hasPurchased(address buyer, uint256 courseId) external view returns (bool);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IStakingTreasury {
        function depositEth() external payable;
        function depositYd(uint256 amount) external;
        function withdrawEth(uint256 amount) external;
        function withdrawYd(uint256 amount) external;
        function positions(address) external view returns (uint256 ethAmount, uint256 ydAmount);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IProfileRegistry {
        function setProfile(string displayName, string metadata) external;
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IBalanceRegistry {
        function balanceOf(address user) external view returns (uint256);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IPlatformToken {
        function tokenPrice() external view returns (uint256);
        function buyTokens() external payable;
        function burn(uint256 amount) external;
        function mint(address to, uint256 amount) external;
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
